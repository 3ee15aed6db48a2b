use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::Player;
use crate::scoring;

pub const MOCK_UID_PREFIX: &str = "mock_";
pub const ANONYMOUS_NAME: &str = "Anonymous Player";

/// The signed-in player, handed to controllers at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            email: String::new(),
            avatar_url: None,
        }
    }

    /// Local stand-in used when no identity provider is available.
    pub fn mock(display_name: impl Into<String>) -> Self {
        Self::new(
            format!("{}{}", MOCK_UID_PREFIX, Uuid::new_v4().simple()),
            display_name,
        )
    }

    pub fn is_mock(&self) -> bool {
        self.uid.starts_with(MOCK_UID_PREFIX)
    }

    /// Fresh roster entry: zero score, not ready.
    pub fn as_player(&self) -> Player {
        Player::new(self.uid.clone(), self.display_name.clone()).with_avatar(self.avatar_url.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub total_score: u64,
    pub games_played: u32,
    pub games_won: u32,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn for_identity(identity: &Identity) -> Self {
        let display_name = if identity.display_name.trim().is_empty() {
            ANONYMOUS_NAME.to_string()
        } else {
            identity.display_name.clone()
        };
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name,
            photo_url: identity.avatar_url.clone(),
            total_score: 0,
            games_played: 0,
            games_won: 0,
            created_at: Utc::now(),
        }
    }

    /// Whole percent, rounded half up. Zero before the first game.
    pub fn win_rate(&self) -> u32 {
        if self.games_played == 0 {
            return 0;
        }
        let played = self.games_played as u64;
        ((self.games_won as u64 * 100 + played / 2) / played) as u32
    }

    pub fn average_score(&self) -> u64 {
        if self.games_played == 0 {
            return 0;
        }
        let played = self.games_played as u64;
        (self.total_score + played / 2) / played
    }

    pub fn games_lost(&self) -> u32 {
        self.games_played.saturating_sub(self.games_won)
    }

    pub fn record_game(&mut self, score: u32, won: bool) {
        self.games_played += 1;
        self.total_score += score as u64;
        if won {
            self.games_won += 1;
        }
    }

    /// Record the outcome of a finished game for `uid` from the final roster.
    /// Returns false when `uid` did not play.
    pub fn record_final_roster(&mut self, players: &[Player]) -> bool {
        let Some(me) = players.iter().find(|p| p.id == self.uid) else {
            return false;
        };
        let won = scoring::winners(players).iter().any(|w| w.id == me.id);
        self.record_game(me.score, won);
        true
    }

    pub fn achievements(&self) -> Vec<Achievement> {
        let win_rate = self.win_rate();
        vec![
            Achievement {
                id: "first_win",
                name: "First Victory",
                description: "Win your first game",
                unlocked: self.games_won >= 1,
            },
            Achievement {
                id: "artist",
                name: "Artist",
                description: "Play 10 games",
                unlocked: self.games_played >= 10,
            },
            Achievement {
                id: "champion",
                name: "Champion",
                description: "Win 5 games",
                unlocked: self.games_won >= 5,
            },
            Achievement {
                id: "high_scorer",
                name: "High Scorer",
                description: "Reach 1000 total points",
                unlocked: self.total_score >= 1000,
            },
            Achievement {
                id: "streaker",
                name: "Win Streak",
                description: "Maintain 80% win rate",
                unlocked: win_rate >= 80 && self.games_played >= 5,
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub unlocked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile::for_identity(&Identity::new("u1", "Ada"))
    }

    fn unlocked(p: &UserProfile) -> Vec<&'static str> {
        p.achievements()
            .into_iter()
            .filter(|a| a.unlocked)
            .map(|a| a.id)
            .collect()
    }

    #[test]
    fn test_mock_identity() {
        let id = Identity::mock("Guest");
        assert!(id.is_mock());
        assert!(id.uid.starts_with("mock_"));
        assert_ne!(id.uid, Identity::mock("Guest").uid);
        assert!(!Identity::new("google-123", "Ada").is_mock());
    }

    #[test]
    fn test_as_player_is_fresh() {
        let mut id = Identity::new("u1", "Ada");
        id.avatar_url = Some("https://example.com/ada.png".into());
        let p = id.as_player();
        assert_eq!(p.id, "u1");
        assert_eq!(p.score, 0);
        assert!(!p.is_ready);
        assert_eq!(p.avatar_url.as_deref(), Some("https://example.com/ada.png"));
    }

    #[test]
    fn test_blank_name_falls_back() {
        let p = UserProfile::for_identity(&Identity::new("u2", "  "));
        assert_eq!(p.display_name, ANONYMOUS_NAME);
    }

    #[test]
    fn test_stats_start_at_zero() {
        let p = profile();
        assert_eq!(p.win_rate(), 0);
        assert_eq!(p.average_score(), 0);
        assert!(unlocked(&p).is_empty());
    }

    #[test]
    fn test_rates_round_half_up() {
        let mut p = profile();
        p.record_game(100, true);
        p.record_game(51, false);
        p.record_game(0, false);
        // 1/3 -> 33%, 151/3 -> 50
        assert_eq!(p.win_rate(), 33);
        assert_eq!(p.average_score(), 50);
        assert_eq!(p.games_lost(), 2);

        p.record_game(0, true);
        // 2/4 -> 50%
        assert_eq!(p.win_rate(), 50);
    }

    #[test]
    fn test_achievements_unlock() {
        let mut p = profile();
        p.record_game(300, true);
        assert_eq!(unlocked(&p), vec!["first_win"]);

        for _ in 0..4 {
            p.record_game(200, true);
        }
        // 5 games, 5 wins, 1100 points
        assert_eq!(unlocked(&p), vec!["first_win", "champion", "high_scorer", "streaker"]);

        for _ in 0..5 {
            p.record_game(0, false);
        }
        // 10 games, 50% win rate
        assert_eq!(unlocked(&p), vec!["first_win", "artist", "champion", "high_scorer"]);
    }

    #[test]
    fn test_record_final_roster() {
        let mut alice = Player::new("u1", "Ada");
        alice.score = 80;
        let mut bob = Player::new("u9", "Bob");
        bob.score = 80;
        let roster = vec![alice, bob];

        let mut p = profile();
        assert!(p.record_final_roster(&roster));
        assert_eq!(p.games_played, 1);
        assert_eq!(p.games_won, 1);
        assert_eq!(p.total_score, 80);

        let mut outsider = UserProfile::for_identity(&Identity::new("zz", "Zed"));
        assert!(!outsider.record_final_roster(&roster));
        assert_eq!(outsider.games_played, 0);
    }

    #[test]
    fn test_profile_document_field_names() {
        let json = serde_json::to_value(profile()).unwrap();
        assert_eq!(json["displayName"], "Ada");
        assert_eq!(json["totalScore"], 0);
        assert_eq!(json["gamesPlayed"], 0);
        assert_eq!(json["gamesWon"], 0);
        assert!(json.get("createdAt").is_some());
    }
}
