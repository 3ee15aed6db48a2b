use serde::{Deserialize, Serialize};

use crate::room::Player;

/// Floor applied to every correct guess, so late guesses still count.
pub const MIN_AWARD: u32 = 10;

/// Points for a correct guess made with `time_left` seconds on the clock.
pub fn award(time_left: u32) -> u32 {
    time_left.max(MIN_AWARD)
}

pub fn normalize_guess(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Exact match after trimming and lowercasing both sides. No near-miss credit.
pub fn is_correct(guess: &str, word: &str) -> bool {
    let guess = normalize_guess(guess);
    !guess.is_empty() && guess == normalize_guess(word)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based; tied scores share a rank and the next rank is skipped.
    pub rank: usize,
    pub player_id: String,
    pub display_name: String,
    pub score: u32,
}

/// Players ordered by score, highest first. Ties keep roster order.
pub fn standings(players: &[Player]) -> Vec<Standing> {
    let mut sorted: Vec<&Player> = players.iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));

    let mut result: Vec<Standing> = Vec::with_capacity(sorted.len());
    for (idx, p) in sorted.iter().enumerate() {
        let rank = match result.last() {
            Some(prev) if prev.score == p.score => prev.rank,
            _ => idx + 1,
        };
        result.push(Standing {
            rank,
            player_id: p.id.clone(),
            display_name: p.display_name.clone(),
            score: p.score,
        });
    }
    result
}

/// Everyone holding the top score. Nobody wins a game where nobody scored.
pub fn winners(players: &[Player]) -> Vec<&Player> {
    let top = players.iter().map(|p| p.score).max().unwrap_or(0);
    if top == 0 {
        return Vec::new();
    }
    players.iter().filter(|p| p.score == top).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, score: u32) -> Player {
        let mut p = Player::new(id, id.to_uppercase());
        p.score = score;
        p
    }

    #[test]
    fn test_award_floor() {
        assert_eq!(award(3), 10);
        assert_eq!(award(0), 10);
        assert_eq!(award(10), 10);
        assert_eq!(award(47), 47);
        assert_eq!(award(90), 90);
    }

    #[test]
    fn test_guess_matching() {
        assert!(is_correct(" CAT ", "cat"));
        assert!(is_correct("Ice Cream", "ice cream"));
        assert!(!is_correct("cats", "cat"));
        assert!(!is_correct("c at", "cat"));
        assert!(!is_correct("   ", "cat"));
    }

    #[test]
    fn test_standings_order_and_ties() {
        let players = vec![
            player("a", 30),
            player("b", 90),
            player("c", 30),
            player("d", 0),
        ];
        let table = standings(&players);
        let order: Vec<(&str, usize)> = table
            .iter()
            .map(|s| (s.player_id.as_str(), s.rank))
            .collect();
        assert_eq!(order, vec![("b", 1), ("a", 2), ("c", 2), ("d", 4)]);
    }

    #[test]
    fn test_winners() {
        let players = vec![player("a", 50), player("b", 50), player("c", 10)];
        let ids: Vec<&str> = winners(&players).iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let scoreless = vec![player("a", 0), player("b", 0)];
        assert!(winners(&scoreless).is_empty());
    }
}
