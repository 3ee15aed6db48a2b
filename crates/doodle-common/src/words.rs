use rand::seq::SliceRandom;
use rand::Rng;

pub const VOCABULARY: [&str; 30] = [
    "cat",
    "dog",
    "house",
    "tree",
    "car",
    "sun",
    "moon",
    "star",
    "fish",
    "bird",
    "flower",
    "apple",
    "banana",
    "guitar",
    "pizza",
    "rocket",
    "bicycle",
    "umbrella",
    "castle",
    "dragon",
    "robot",
    "rainbow",
    "snowman",
    "butterfly",
    "elephant",
    "lighthouse",
    "mountain",
    "ice cream",
    "airplane",
    "penguin",
];

/// Uniform pick, independent of earlier picks. Words may repeat.
pub fn pick(rng: &mut impl Rng) -> &'static str {
    VOCABULARY
        .choose(rng)
        .copied()
        .unwrap_or(VOCABULARY[0])
}

/// Hint shown to guessers: one underscore per letter, spaces kept.
pub fn mask(word: &str) -> String {
    word.chars()
        .map(|c| if c.is_whitespace() { "  " } else { "_ " })
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_pick_is_from_vocabulary() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..200 {
            assert!(VOCABULARY.contains(&pick(&mut rng)));
        }
    }

    #[test]
    fn test_pick_covers_vocabulary() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let seen: HashSet<&str> = (0..2000).map(|_| pick(&mut rng)).collect();
        assert_eq!(seen.len(), VOCABULARY.len());
    }

    #[test]
    fn test_vocabulary_is_unique_and_lowercase() {
        let unique: HashSet<&str> = VOCABULARY.iter().copied().collect();
        assert_eq!(unique.len(), VOCABULARY.len());
        assert!(VOCABULARY.iter().all(|w| *w == w.to_lowercase()));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("cat"), "_ _ _");
        assert_eq!(mask("ice cream"), "_ _ _   _ _ _ _ _");
    }
}
