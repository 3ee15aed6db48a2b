use serde::{Deserialize, Serialize};

use crate::room::{Room, RoomCode, RoomPatch};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyEntry {
    pub player_id: String,
    pub display_name: String,
    pub is_ready: bool,
    pub is_creator: bool,
    pub is_local: bool,
}

/// What a lobby screen shows, derived fresh from each room snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyView {
    pub code: RoomCode,
    pub entries: Vec<LobbyEntry>,
    pub max_rounds: u32,
    pub local_is_creator: bool,
    pub local_ready: bool,
    pub can_start: bool,
}

impl LobbyView {
    pub fn from_room(room: &Room, local_id: &str) -> Self {
        let entries = room
            .players
            .iter()
            .map(|p| LobbyEntry {
                player_id: p.id.clone(),
                display_name: p.display_name.clone(),
                is_ready: p.is_ready,
                is_creator: room.is_creator(&p.id),
                is_local: p.id == local_id,
            })
            .collect();
        Self {
            code: room.code.clone(),
            entries,
            max_rounds: room.max_rounds,
            local_is_creator: room.is_creator(local_id),
            local_ready: room.player(local_id).map(|p| p.is_ready).unwrap_or(false),
            can_start: authorize_start(room, local_id).is_ok(),
        }
    }

    pub fn ready_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_ready).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyTransition {
    Stay,
    /// The room has started; the lobby hands over to the game view.
    EnterGame,
    /// The room no longer resolves; go back to the dashboard.
    RoomGone,
}

/// Decide where a client belongs after fetching the room.
pub fn reconcile(snapshot: Option<&Room>) -> LobbyTransition {
    match snapshot {
        None => LobbyTransition::RoomGone,
        Some(room) if room.started => LobbyTransition::EnterGame,
        Some(_) => LobbyTransition::Stay,
    }
}

/// Only the creator may start, the creator must be in the roster, and
/// everyone must be ready.
pub fn authorize_start(room: &Room, requester_id: &str) -> Result<(), LobbyError> {
    if room.started {
        return Err(LobbyError::AlreadyStarted);
    }
    if !room.is_creator(requester_id) {
        return Err(LobbyError::NotCreator);
    }
    if !room.creator_present() {
        return Err(LobbyError::CreatorAbsent);
    }
    if !room.all_ready() {
        return Err(LobbyError::NotAllReady);
    }
    Ok(())
}

/// Build the patch that flips `player_id`'s ready flag, or `None` when the
/// toggle would be a no-op.
pub fn toggle_ready(room: &Room, player_id: &str) -> Option<RoomPatch> {
    let current = room.player(player_id)?.is_ready;
    let mut updated = room.clone();
    if !updated.set_ready(player_id, !current) {
        return None;
    }
    Some(RoomPatch::players(updated.players))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),
    #[error("only the room creator can start the game")]
    NotCreator,
    #[error("the room creator has not joined yet")]
    CreatorAbsent,
    #[error("not all players are ready (need at least 2)")]
    NotAllReady,
    #[error("game already started")]
    AlreadyStarted,
}
