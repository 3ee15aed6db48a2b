use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::RwLock;
use uuid::Uuid;

use doodle_common::store::Documents;

use crate::connection::{self, ConnectionInfo};

pub struct ServerState {
    pub documents: RwLock<Documents>,
    pub connections: RwLock<HashMap<Uuid, ConnectionInfo>>,
    pub max_connections: usize,
}

impl ServerState {
    pub fn new(max_connections: usize) -> Self {
        Self {
            documents: RwLock::new(Documents::new()),
            connections: RwLock::new(HashMap::new()),
            max_connections,
        }
    }
}

pub type SharedState = Arc<ServerState>;

pub async fn run(addr: SocketAddr, max_connections: usize) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    serve(listener, Arc::new(ServerState::new(max_connections))).await
}

pub async fn serve(listener: TcpListener, state: SharedState) -> anyhow::Result<()> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;

        let conn_count = state.connections.read().await.len();
        if conn_count >= state.max_connections {
            tracing::warn!(
                "Rejecting connection from {} (max {} reached)",
                peer_addr,
                state.max_connections
            );
            drop(stream);
            continue;
        }

        tracing::info!(
            "New connection from {} ({}/{})",
            peer_addr,
            conn_count + 1,
            state.max_connections
        );

        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = connection::handle_connection(stream, peer_addr, state).await {
                tracing::warn!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doodle_common::profile::{Identity, UserProfile};
    use doodle_common::protocol::{self, framed_transport, ErrorCode, StoreResponse};
    use doodle_common::room::{Player, Room, RoomCode, RoomPatch, MAX_PLAYERS};
    use doodle_common::store::{RemoteStore, StoreError};

    async fn spawn_server(max_connections: usize) -> (SocketAddr, SharedState) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state: SharedState = Arc::new(ServerState::new(max_connections));
        tokio::spawn(serve(listener, state.clone()));
        (addr, state)
    }

    fn code() -> RoomCode {
        RoomCode::parse("SRV001").unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let (addr, _) = spawn_server(4).await;
        let store = RemoteStore::new(addr.to_string());
        assert_eq!(store.ping().await.unwrap(), protocol::PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_room_lifecycle() {
        let (addr, state) = spawn_server(4).await;
        let store = RemoteStore::new(addr.to_string());

        store
            .create_room(Room::with_default_rounds(code(), "alice"))
            .await
            .unwrap();
        store
            .upsert_members(&code(), vec![Player::new("alice", "Alice"), Player::new("bob", "Bob")])
            .await
            .unwrap();

        let mut room = store.fetch_room(&code()).await.unwrap().unwrap();
        assert_eq!(room.players.len(), 2);
        assert!(!room.started);

        room.set_ready("alice", true);
        store
            .patch_room(&code(), RoomPatch::players(room.players.clone()))
            .await
            .unwrap();
        store.patch_room(&code(), RoomPatch::start()).await.unwrap();

        let room = store.fetch_room(&code()).await.unwrap().unwrap();
        assert!(room.started);
        assert!(room.player("alice").unwrap().is_ready);
        assert!(!room.player("bob").unwrap().is_ready);

        assert_eq!(state.documents.read().await.rooms.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_room() {
        let (addr, _) = spawn_server(4).await;
        let store = RemoteStore::new(addr.to_string());

        assert!(store.fetch_room(&code()).await.unwrap().is_none());
        let err = store.patch_room(&code(), RoomPatch::start()).await.unwrap_err();
        assert!(matches!(err, StoreError::RoomNotFound(c) if c == code()));
        let err = store
            .upsert_members(&code(), vec![Player::new("a", "A")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let (addr, _) = spawn_server(4).await;
        let store = RemoteStore::new(addr.to_string());
        store
            .create_room(Room::with_default_rounds(code(), "alice"))
            .await
            .unwrap();
        let err = store
            .create_room(Room::with_default_rounds(code(), "mallory"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RoomExists(_)));
    }

    #[tokio::test]
    async fn test_room_full() {
        let (addr, _) = spawn_server(4).await;
        let store = RemoteStore::new(addr.to_string());
        store
            .create_room(Room::with_default_rounds(code(), "p0"))
            .await
            .unwrap();
        let full: Vec<Player> = (0..MAX_PLAYERS)
            .map(|i| Player::new(format!("p{}", i), format!("P{}", i)))
            .collect();
        store.upsert_members(&code(), full).await.unwrap();

        let err = store
            .upsert_members(&code(), vec![Player::new("late", "Late")])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::RoomFull);

        // Existing members may still re-join.
        store
            .upsert_members(&code(), vec![Player::new("p2", "Renamed")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_profiles() {
        let (addr, _) = spawn_server(4).await;
        let store = RemoteStore::new(addr.to_string());
        assert!(store.fetch_profile("alice").await.unwrap().is_none());

        let mut profile = UserProfile::for_identity(&Identity::new("alice", "Alice"));
        profile.record_game(120, true);
        store.put_profile(profile.clone()).await.unwrap();
        assert_eq!(store.fetch_profile("alice").await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_malformed_request_gets_error() {
        let (addr, _) = spawn_server(4).await;
        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let mut transport = framed_transport(stream);

        protocol::send_message(&mut transport, &"not a request").await.unwrap();
        let response: StoreResponse = protocol::recv_message(&mut transport).await.unwrap().unwrap();
        match response {
            StoreResponse::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidRequest),
            other => panic!("wrong response: {:?}", other),
        }

        // The connection stays usable.
        protocol::send_message(&mut transport, &doodle_common::protocol::StoreRequest::Ping)
            .await
            .unwrap();
        let response: StoreResponse = protocol::recv_message(&mut transport).await.unwrap().unwrap();
        assert!(matches!(response, StoreResponse::Pong { .. }));
    }

    #[tokio::test]
    async fn test_max_connections_enforced() {
        let (addr, state) = spawn_server(1).await;
        let first = RemoteStore::new(addr.to_string());
        first.ping().await.unwrap();
        assert_eq!(state.connections.read().await.len(), 1);

        let second = RemoteStore::new(addr.to_string());
        let err = second.ping().await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
