use std::time::Duration;

use rand::Rng;

use crate::config::Timing;
use crate::game::{Advance, ChatMessage, GameError, GamePhase, GameState, GuessResult, TickOutcome};
use crate::profile::Identity;
use crate::room::{Room, RoomCode, RoomPatch};
use crate::scoring::{self, Standing};
use crate::words;

/// Work the session asks its host to carry out. Repository writes and
/// deferred callbacks live outside the session so it stays synchronous.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Persist(RoomPatch),
    /// Read-modify-write of the stored roster.
    AwardScore { player_id: String, points: u32 },
    /// Emitted on the new drawer's client only.
    ClearCanvas,
    EndRoundAfter(Duration),
    AdvanceAfter(Duration),
    ShowScoreboardAfter(Duration),
}

/// One client's view of a running game: the last room snapshot plus the
/// locally owned round state.
#[derive(Debug, Clone)]
pub struct Session {
    room: Room,
    local: Identity,
    game: GameState,
    timing: Timing,
}

impl Session {
    /// Enter the game view. A missing room sends the player back to the
    /// dashboard; a room still in the lobby sends them to the lobby.
    pub fn load(
        code: &RoomCode,
        snapshot: Option<Room>,
        local: Identity,
        timing: Timing,
        rng: &mut impl Rng,
    ) -> Result<(Self, Vec<Effect>), SessionError> {
        let room = snapshot.ok_or_else(|| SessionError::RoomNotFound(code.clone()))?;
        if !room.started {
            return Err(SessionError::NotStarted(room.code));
        }

        let mut game = GameState::with_round_secs(room.max_rounds, timing.round_secs);
        game.start(&room.players, rng)?;
        tracing::info!(
            "Session started in {} as {} (drawer: {:?})",
            room.code,
            local.uid,
            game.current_drawer_id()
        );

        let session = Self {
            room,
            local,
            game,
            timing,
        };
        let effects = if session.is_local_drawing() {
            vec![Effect::ClearCanvas]
        } else {
            Vec::new()
        };
        Ok((session, effects))
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn local(&self) -> &Identity {
        &self.local
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn phase(&self) -> &GamePhase {
        &self.game.phase
    }

    pub fn is_local_drawing(&self) -> bool {
        self.game.is_drawer(&self.local.uid)
    }

    pub fn tick(&mut self) -> Vec<Effect> {
        match self.game.tick() {
            TickOutcome::Expired => {
                tracing::debug!("Round timer expired in {}", self.room.code);
                vec![Effect::AdvanceAfter(self.timing.round_end_grace)]
            }
            TickOutcome::Running(_) | TickOutcome::Idle => Vec::new(),
        }
    }

    /// Chat input from the local player.
    pub fn submit_guess(&mut self, text: &str) -> (GuessResult, Vec<Effect>) {
        let uid = self.local.uid.clone();
        let result = self.game.submit(&mut self.room, &uid, text);
        let mut effects = Vec::new();
        if result.correct {
            tracing::info!("{} guessed the word for {} points", uid, result.points);
            effects.push(Effect::AwardScore {
                player_id: uid,
                points: result.points,
            });
        }
        if result.round_complete {
            effects.push(Effect::EndRoundAfter(self.timing.guess_render_delay));
        }
        (result, effects)
    }

    /// Deferred early end. A no-op if the timer already ended the round.
    pub fn end_round(&mut self) -> Vec<Effect> {
        match self.game.end_round() {
            Ok(()) => vec![Effect::AdvanceAfter(self.timing.round_end_grace)],
            Err(_) => Vec::new(),
        }
    }

    pub fn advance(&mut self, rng: &mut impl Rng) -> Vec<Effect> {
        let round_before = self.game.round;
        match self.game.advance(&self.room.players, rng) {
            Ok(Advance::NextTurn { drawer_id, round }) => {
                tracing::info!(
                    "Room {} round {}/{}: {} draws",
                    self.room.code,
                    round,
                    self.game.max_rounds,
                    drawer_id
                );
                let mut effects = Vec::new();
                if round != round_before {
                    effects.push(Effect::Persist(RoomPatch::round(round)));
                }
                if drawer_id == self.local.uid {
                    effects.push(Effect::ClearCanvas);
                }
                effects
            }
            Ok(Advance::GameComplete) => {
                tracing::info!("Game complete in {}", self.room.code);
                vec![Effect::ShowScoreboardAfter(self.timing.scoreboard_delay)]
            }
            Err(e) => {
                tracing::debug!("Ignoring advance: {}", e);
                Vec::new()
            }
        }
    }

    /// Replace the roster with the latest snapshot. Round state stays local;
    /// the current drawer keeps the turn even if the roster shifted.
    pub fn reconcile(&mut self, snapshot: Option<Room>) -> Result<(), SessionError> {
        let room = snapshot.ok_or_else(|| SessionError::RoomNotFound(self.room.code.clone()))?;
        if let Some(turn) = self.game.turn.as_mut() {
            if let Some(idx) = room.position(&turn.drawer_id) {
                turn.drawer_index = idx;
            }
        }
        self.room = room;
        Ok(())
    }

    pub fn view(&self) -> SessionView {
        let drawer = self
            .game
            .current_drawer_id()
            .and_then(|id| self.room.player(id))
            .map(|p| p.display_name.clone());
        let word = self.game.word_for(&self.local.uid).map(str::to_string);
        let hint = match (&word, &self.game.turn) {
            (None, Some(turn)) => Some(words::mask(&turn.word)),
            _ => None,
        };
        SessionView {
            code: self.room.code.clone(),
            phase: self.game.phase.clone(),
            current_drawer: drawer,
            is_local_drawing: self.is_local_drawing(),
            time_left: self.game.time_left(),
            round: self.game.round.min(self.game.max_rounds),
            max_rounds: self.game.max_rounds,
            has_local_guessed: self.game.has_guessed(&self.local.uid),
            word,
            hint,
            messages: self.game.messages.clone(),
            standings: scoring::standings(&self.room.players),
        }
    }
}

/// Everything the game screen renders.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub code: RoomCode,
    pub phase: GamePhase,
    pub current_drawer: Option<String>,
    pub is_local_drawing: bool,
    pub time_left: u32,
    pub round: u32,
    pub max_rounds: u32,
    pub has_local_guessed: bool,
    /// Present for the drawer, and for everyone once the round ends.
    pub word: Option<String>,
    pub hint: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub standings: Vec<Standing>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),
    #[error("room {0} has not started yet")]
    NotStarted(RoomCode),
    #[error(transparent)]
    Game(#[from] GameError),
}
