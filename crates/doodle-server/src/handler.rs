use doodle_common::protocol::{self, StoreRequest, StoreResponse};
use doodle_common::store::StoreError;

use crate::server::SharedState;

pub async fn handle_request(request: StoreRequest, state: &SharedState) -> StoreResponse {
    let op = request.name();
    let result = match request {
        StoreRequest::CreateRoom { room } => {
            let code = room.code.clone();
            let creator = room.creator_id.clone();
            let result = state.documents.write().await.create_room(room);
            if result.is_ok() {
                tracing::info!("Room {} created by {}", code, creator);
            }
            result.map(|()| StoreResponse::Ok)
        }

        StoreRequest::FetchRoom { code } => {
            let room = state.documents.read().await.fetch_room(&code);
            Ok(StoreResponse::Room { room })
        }

        StoreRequest::UpsertMembers { code, players } => {
            let ids: Vec<String> = players.iter().map(|p| p.id.clone()).collect();
            let result = state.documents.write().await.upsert_members(&code, players);
            if result.is_ok() {
                tracing::debug!("Upserted {:?} into room {}", ids, code);
            }
            result.map(|()| StoreResponse::Ok)
        }

        StoreRequest::PatchRoom { code, patch } => {
            let starting = patch.started == Some(true);
            let mut docs = state.documents.write().await;
            let was_started = docs.rooms.get(&code).map(|r| r.started).unwrap_or(false);
            let result = docs.patch_room(&code, patch);
            if result.is_ok() && starting && !was_started {
                tracing::info!("Room {} started", code);
            }
            result.map(|()| StoreResponse::Ok)
        }

        StoreRequest::FetchProfile { uid } => {
            let profile = state.documents.read().await.fetch_profile(&uid);
            Ok(StoreResponse::Profile { profile })
        }

        StoreRequest::PutProfile { profile } => {
            state.documents.write().await.put_profile(profile);
            Ok(StoreResponse::Ok)
        }

        StoreRequest::Ping => Ok(StoreResponse::Pong {
            version: protocol::PROTOCOL_VERSION.to_string(),
        }),
    };

    result.unwrap_or_else(|e: StoreError| {
        tracing::debug!("{} failed: {}", op, e);
        StoreResponse::error(e.code(), e.to_string())
    })
}
