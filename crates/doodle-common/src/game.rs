use std::collections::HashSet;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ROUND_DURATION_SECS;
use crate::room::{Player, Room};
use crate::scoring;
use crate::words;

// -- Chat log --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Chat,
    CorrectGuess { points: u32 },
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `None` for system announcements.
    pub sender_id: Option<String>,
    pub sender_name: String,
    pub text: String,
    pub kind: MessageKind,
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender_id: None,
            sender_name: "System".into(),
            text: text.into(),
            kind: MessageKind::System,
            timestamp: Utc::now().timestamp(),
        }
    }

    fn from_player(player: &Player, text: &str, kind: MessageKind) -> Self {
        Self {
            sender_id: Some(player.id.clone()),
            sender_name: player.display_name.clone(),
            text: text.trim().to_string(),
            kind,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn is_correct_guess(&self) -> bool {
        matches!(self.kind, MessageKind::CorrectGuess { .. })
    }
}

// -- Round state --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Lobby,
    RoundActive,
    /// Grace period with the word revealed.
    RoundEnding,
    GameComplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundState {
    /// Index into the room's roster.
    pub drawer_index: usize,
    pub drawer_id: String,
    pub word: String,
    pub time_left: u32,
    /// Non-drawers who have guessed correctly this round.
    pub guessed: HashSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No round is running; nothing changed.
    Idle,
    Running(u32),
    /// The clock hit zero and the round moved to `RoundEnding`.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuessResult {
    pub accepted: bool,
    pub correct: bool,
    pub points: u32,
    /// Every eligible guesser has now guessed; the round should end.
    pub round_complete: bool,
}

impl GuessResult {
    fn rejected() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    NextTurn { drawer_id: String, round: u32 },
    GameComplete,
}

// -- Game state machine --

/// Ephemeral per-client game state. References players by id only; the
/// roster itself lives in the [`Room`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub phase: GamePhase,
    pub round: u32,
    pub max_rounds: u32,
    pub round_secs: u32,
    pub turn: Option<RoundState>,
    pub messages: Vec<ChatMessage>,
}

impl GameState {
    pub fn new(max_rounds: u32) -> Self {
        Self::with_round_secs(max_rounds, ROUND_DURATION_SECS)
    }

    pub fn with_round_secs(max_rounds: u32, round_secs: u32) -> Self {
        Self {
            phase: GamePhase::Lobby,
            round: 1,
            max_rounds: max_rounds.max(1),
            round_secs: round_secs.max(1),
            turn: None,
            messages: Vec::new(),
        }
    }

    /// First drawer is `players[0]`, round 1.
    pub fn start(&mut self, players: &[Player], rng: &mut impl Rng) -> Result<(), GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::AlreadyStarted);
        }
        if players.is_empty() {
            return Err(GameError::NoPlayers);
        }
        self.round = 1;
        self.begin_turn(0, players, rng);
        Ok(())
    }

    fn begin_turn(&mut self, drawer_index: usize, players: &[Player], rng: &mut impl Rng) {
        let drawer = &players[drawer_index];
        self.turn = Some(RoundState {
            drawer_index,
            drawer_id: drawer.id.clone(),
            word: words::pick(rng).to_string(),
            time_left: self.round_secs,
            guessed: HashSet::new(),
        });
        self.phase = GamePhase::RoundActive;
        self.messages
            .push(ChatMessage::system(format!("{} is drawing now", drawer.display_name)));
    }

    pub fn current_drawer_id(&self) -> Option<&str> {
        self.turn.as_ref().map(|t| t.drawer_id.as_str())
    }

    pub fn is_drawer(&self, player_id: &str) -> bool {
        self.current_drawer_id() == Some(player_id)
    }

    pub fn time_left(&self) -> u32 {
        self.turn.as_ref().map(|t| t.time_left).unwrap_or(0)
    }

    pub fn has_guessed(&self, player_id: &str) -> bool {
        self.turn
            .as_ref()
            .map(|t| t.guessed.contains(player_id))
            .unwrap_or(false)
    }

    pub fn is_complete(&self) -> bool {
        self.phase == GamePhase::GameComplete
    }

    /// The secret word is visible to the drawer, and to everyone once the
    /// round is over.
    pub fn word_for(&self, viewer_id: &str) -> Option<&str> {
        let turn = self.turn.as_ref()?;
        let revealed = matches!(
            self.phase,
            GamePhase::RoundEnding | GamePhase::GameComplete
        );
        if revealed || turn.drawer_id == viewer_id {
            Some(&turn.word)
        } else {
            None
        }
    }

    /// One-second tick. Only counts down while a round is active.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != GamePhase::RoundActive {
            return TickOutcome::Idle;
        }
        let Some(turn) = self.turn.as_mut() else {
            return TickOutcome::Idle;
        };
        if turn.time_left == 0 {
            return TickOutcome::Idle;
        }
        turn.time_left -= 1;
        if turn.time_left == 0 {
            // Phase is RoundActive, so this cannot fail.
            let _ = self.end_round();
            TickOutcome::Expired
        } else {
            TickOutcome::Running(turn.time_left)
        }
    }

    /// Evaluate a chat submission. Drawer messages, repeat guesses from
    /// players who already got it, blank text, and unknown senders are
    /// rejected without touching any state.
    pub fn submit(&mut self, room: &mut Room, player_id: &str, text: &str) -> GuessResult {
        if self.phase != GamePhase::RoundActive {
            return GuessResult::rejected();
        }
        let Some(turn) = self.turn.as_mut() else {
            return GuessResult::rejected();
        };
        if turn.drawer_id == player_id
            || turn.guessed.contains(player_id)
            || text.trim().is_empty()
        {
            return GuessResult::rejected();
        }
        let Some(sender) = room.player(player_id).cloned() else {
            return GuessResult::rejected();
        };

        if !scoring::is_correct(text, &turn.word) {
            self.messages
                .push(ChatMessage::from_player(&sender, text, MessageKind::Chat));
            return GuessResult {
                accepted: true,
                ..GuessResult::default()
            };
        }

        let points = scoring::award(turn.time_left);
        turn.guessed.insert(player_id.to_string());
        let round_complete = turn.guessed.len() >= room.players.len().saturating_sub(1);
        room.add_score(player_id, points);
        self.messages.push(ChatMessage::from_player(
            &sender,
            text,
            MessageKind::CorrectGuess { points },
        ));

        GuessResult {
            accepted: true,
            correct: true,
            points,
            round_complete,
        }
    }

    /// RoundActive -> RoundEnding. The word is announced to everyone.
    pub fn end_round(&mut self) -> Result<(), GameError> {
        if self.phase != GamePhase::RoundActive {
            return Err(GameError::RoundNotActive);
        }
        let turn = self.turn.as_ref().ok_or(GameError::RoundNotActive)?;
        self.messages
            .push(ChatMessage::system(format!("The word was '{}'", turn.word)));
        self.phase = GamePhase::RoundEnding;
        Ok(())
    }

    /// RoundEnding -> next turn, or -> GameComplete once the rotation wraps
    /// past the last round.
    pub fn advance(
        &mut self,
        players: &[Player],
        rng: &mut impl Rng,
    ) -> Result<Advance, GameError> {
        if self.phase != GamePhase::RoundEnding {
            return Err(GameError::RoundNotEnding);
        }
        if players.is_empty() {
            return Err(GameError::NoPlayers);
        }
        let current = self.turn.as_ref().map(|t| t.drawer_index).unwrap_or(0);
        let next = (current + 1) % players.len();
        if next == 0 {
            self.round += 1;
            if self.round > self.max_rounds {
                self.phase = GamePhase::GameComplete;
                return Ok(Advance::GameComplete);
            }
        }
        self.begin_turn(next, players, rng);
        Ok(Advance::NextTurn {
            drawer_id: players[next].id.clone(),
            round: self.round,
        })
    }
}

// -- Errors --

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("no players in room")]
    NoPlayers,
    #[error("game already started")]
    AlreadyStarted,
    #[error("no round in progress")]
    RoundNotActive,
    #[error("round is not ending")]
    RoundNotEnding,
}
