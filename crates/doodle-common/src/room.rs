use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_ROUNDS;

pub const ROOM_CODE_LEN: usize = 6;
pub const ROOM_CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const MAX_PLAYERS: usize = 8;
pub const MIN_PLAYERS_TO_START: usize = 2;

// -- Room code --

/// Six characters from `A-Z0-9`. Also the lookup key of the room record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Independent uniform draws from the 36-character alphabet.
    pub fn generate(rng: &mut impl Rng) -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Parse user input: surrounding whitespace is ignored and letters are
    /// uppercased before validation.
    pub fn parse(input: &str) -> Result<Self, RoomCodeError> {
        let code = input.trim().to_ascii_uppercase();
        let len = code.chars().count();
        if len != ROOM_CODE_LEN {
            return Err(RoomCodeError::Length(len));
        }
        if let Some(c) = code
            .chars()
            .find(|c| !c.is_ascii_uppercase() && !c.is_ascii_digit())
        {
            return Err(RoomCodeError::InvalidChar(c));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomCodeError {
    #[error("room code must be {ROOM_CODE_LEN} characters (got {0})")]
    Length(usize),
    #[error("room code may only contain A-Z and 0-9 (found {0:?})")]
    InvalidChar(char),
}

// -- Player --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(rename = "uid")]
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub score: u32,
    pub is_ready: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
            score: 0,
            is_ready: false,
        }
    }

    pub fn with_avatar(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = avatar_url;
        self
    }
}

// -- Room --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(rename = "roomCode")]
    pub code: RoomCode,
    /// Order defines turn rotation.
    pub players: Vec<Player>,
    // Advisory only: live round state is tracked by each client's session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_drawer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_word: Option<String>,
    pub round: u32,
    pub max_rounds: u32,
    pub started: bool,
    #[serde(rename = "createdBy")]
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(code: RoomCode, creator_id: impl Into<String>, max_rounds: u32) -> Self {
        Self {
            code,
            players: Vec::new(),
            current_drawer: None,
            current_word: None,
            round: 1,
            max_rounds: max_rounds.max(1),
            started: false,
            creator_id: creator_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_default_rounds(code: RoomCode, creator_id: impl Into<String>) -> Self {
        Self::new(code, creator_id, DEFAULT_MAX_ROUNDS)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn position(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    pub fn is_creator(&self, player_id: &str) -> bool {
        self.creator_id == player_id
    }

    pub fn creator_present(&self) -> bool {
        self.player(&self.creator_id).is_some()
    }

    /// Upsert by id: an existing entry is replaced in place, a new one is
    /// appended. Allowed before and after the game has started.
    pub fn join(&mut self, player: Player) -> Result<(), RosterError> {
        match self.position(&player.id) {
            Some(idx) => self.players[idx] = player,
            None => {
                if self.players.len() >= MAX_PLAYERS {
                    return Err(RosterError::RoomFull(MAX_PLAYERS));
                }
                self.players.push(player);
            }
        }
        Ok(())
    }

    /// Applies `join` to each player in order.
    pub fn upsert_members(&mut self, players: Vec<Player>) -> Result<(), RosterError> {
        for player in players {
            self.join(player)?;
        }
        Ok(())
    }

    /// Returns whether a flag changed. Unknown ids and rooms that have
    /// already started are left untouched.
    pub fn set_ready(&mut self, player_id: &str, ready: bool) -> bool {
        if self.started {
            return false;
        }
        match self.players.iter_mut().find(|p| p.id == player_id) {
            Some(p) if p.is_ready != ready => {
                p.is_ready = ready;
                true
            }
            _ => false,
        }
    }

    /// Never true for fewer than two players.
    pub fn all_ready(&self) -> bool {
        self.players.len() >= MIN_PLAYERS_TO_START && self.players.iter().all(|p| p.is_ready)
    }

    /// Returns the player's new score, or `None` if the id is not in the roster.
    pub fn add_score(&mut self, player_id: &str, delta: u32) -> Option<u32> {
        let player = self.players.iter_mut().find(|p| p.id == player_id)?;
        player.score = player.score.saturating_add(delta);
        Some(player.score)
    }

    /// Whole-field replace-merge. `started` never reverts to false.
    pub fn apply_patch(&mut self, patch: RoomPatch) {
        if let Some(players) = patch.players {
            self.players = players;
        }
        if let Some(drawer) = patch.current_drawer {
            self.current_drawer = Some(drawer);
        }
        if let Some(word) = patch.current_word {
            self.current_word = Some(word);
        }
        if let Some(round) = patch.round {
            self.round = round;
        }
        if let Some(started) = patch.started {
            self.started |= started;
        }
    }
}

/// Fields to overwrite on a stored room. Omitted fields keep their value.
/// `max_rounds`, the creator and the creation time are fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<Player>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_drawer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<bool>,
}

impl RoomPatch {
    pub fn players(players: Vec<Player>) -> Self {
        Self {
            players: Some(players),
            ..Self::default()
        }
    }

    pub fn start() -> Self {
        Self {
            started: Some(true),
            ..Self::default()
        }
    }

    pub fn round(round: u32) -> Self {
        Self {
            round: Some(round),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("room is full (max {0} players)")]
    RoomFull(usize),
}
