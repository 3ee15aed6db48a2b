use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::config::{BackendKind, FallbackPolicy, StoreConfig};
use crate::profile::{Identity, UserProfile};
use crate::protocol::{
    self, framed_transport, ErrorCode, StoreRequest, StoreResponse, Transport,
};
use crate::room::{Player, Room, RoomCode, RoomPatch, RosterError};

// -- Errors --

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),
    #[error("room {0} already exists")]
    RoomExists(RoomCode),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::RoomNotFound(_) => ErrorCode::RoomNotFound,
            StoreError::RoomExists(_) => ErrorCode::RoomExists,
            StoreError::Roster(RosterError::RoomFull(_)) => ErrorCode::RoomFull,
            StoreError::Protocol(_) | StoreError::Serialization(_) => ErrorCode::InvalidRequest,
            StoreError::Unavailable(_) | StoreError::Io(_) => ErrorCode::InternalError,
        }
    }
}

// -- Document table --

/// Room and profile documents keyed by room code and uid. Shared by the
/// in-process store and the store service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Documents {
    pub rooms: HashMap<RoomCode, Room>,
    pub profiles: HashMap<String, UserProfile>,
}

impl Documents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_room(&mut self, room: Room) -> Result<(), StoreError> {
        if self.rooms.contains_key(&room.code) {
            return Err(StoreError::RoomExists(room.code));
        }
        self.rooms.insert(room.code.clone(), room);
        Ok(())
    }

    pub fn fetch_room(&self, code: &RoomCode) -> Option<Room> {
        self.rooms.get(code).cloned()
    }

    /// All-or-nothing: a full roster leaves the stored room untouched.
    pub fn upsert_members(
        &mut self,
        code: &RoomCode,
        players: Vec<Player>,
    ) -> Result<(), StoreError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::RoomNotFound(code.clone()))?;
        let mut updated = room.clone();
        updated.upsert_members(players)?;
        *room = updated;
        Ok(())
    }

    pub fn patch_room(&mut self, code: &RoomCode, patch: RoomPatch) -> Result<(), StoreError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::RoomNotFound(code.clone()))?;
        room.apply_patch(patch);
        Ok(())
    }

    pub fn fetch_profile(&self, uid: &str) -> Option<UserProfile> {
        self.profiles.get(uid).cloned()
    }

    pub fn put_profile(&mut self, profile: UserProfile) {
        self.profiles.insert(profile.uid.clone(), profile);
    }
}

// -- Local backend --

/// In-process store, optionally mirrored to a JSON file after every write.
pub struct LocalStore {
    docs: Mutex<Documents>,
    data_file: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            docs: Mutex::new(Documents::new()),
            data_file: None,
        }
    }

    /// Load `path` if it exists; otherwise start empty and create it on the
    /// first write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let docs = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Documents::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Local store opened at {}", path.display());
        Ok(Self {
            docs: Mutex::new(docs),
            data_file: Some(path),
        })
    }

    async fn persist(&self, docs: &Documents) -> Result<(), StoreError> {
        if let Some(path) = &self.data_file {
            let bytes = serde_json::to_vec_pretty(docs)?;
            tokio::fs::write(path, bytes).await?;
        }
        Ok(())
    }

    pub async fn create_room(&self, room: Room) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().await;
        docs.create_room(room)?;
        self.persist(&docs).await
    }

    pub async fn fetch_room(&self, code: &RoomCode) -> Result<Option<Room>, StoreError> {
        Ok(self.docs.lock().await.fetch_room(code))
    }

    pub async fn upsert_members(
        &self,
        code: &RoomCode,
        players: Vec<Player>,
    ) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().await;
        docs.upsert_members(code, players)?;
        self.persist(&docs).await
    }

    pub async fn patch_room(&self, code: &RoomCode, patch: RoomPatch) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().await;
        docs.patch_room(code, patch)?;
        self.persist(&docs).await
    }

    pub async fn fetch_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.docs.lock().await.fetch_profile(uid))
    }

    pub async fn put_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().await;
        docs.put_profile(profile);
        self.persist(&docs).await
    }
}

// -- Remote backend --

/// Client of the store service. Connects lazily and reconnects on the next
/// call after any transport failure. No timeouts, no retries.
pub struct RemoteStore {
    addr: String,
    transport: Mutex<Option<Transport>>,
}

impl RemoteStore {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            transport: Mutex::new(None),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn call(&self, request: StoreRequest) -> Result<StoreResponse, StoreError> {
        let mut guard = self.transport.lock().await;
        if guard.is_none() {
            let stream = TcpStream::connect(&self.addr)
                .await
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", self.addr, e)))?;
            tracing::debug!("Connected to store at {}", self.addr);
            *guard = Some(framed_transport(stream));
        }
        let Some(transport) = guard.as_mut() else {
            return Err(StoreError::Unavailable("not connected".into()));
        };

        let result = match protocol::send_message(transport, &request).await {
            Ok(()) => protocol::recv_message::<StoreResponse>(transport).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(Some(response)) => Ok(response),
            Ok(None) => {
                *guard = None;
                Err(StoreError::Unavailable("connection closed by store".into()))
            }
            Err(e) => {
                *guard = None;
                Err(StoreError::Unavailable(e.to_string()))
            }
        }
    }

    fn unexpected(request: &str, response: StoreResponse) -> StoreError {
        StoreError::Protocol(format!("unexpected response to {}: {:?}", request, response))
    }

    fn remote_error(code: ErrorCode, message: String, room: Option<&RoomCode>) -> StoreError {
        match (code, room) {
            (ErrorCode::RoomNotFound, Some(room)) => StoreError::RoomNotFound(room.clone()),
            (ErrorCode::RoomExists, Some(room)) => StoreError::RoomExists(room.clone()),
            (ErrorCode::RoomFull, _) => {
                StoreError::Roster(RosterError::RoomFull(crate::room::MAX_PLAYERS))
            }
            _ => StoreError::Protocol(message),
        }
    }

    fn expect_ok(
        request: &str,
        response: StoreResponse,
        room: Option<&RoomCode>,
    ) -> Result<(), StoreError> {
        match response {
            StoreResponse::Ok => Ok(()),
            StoreResponse::Error { code, message } => Err(Self::remote_error(code, message, room)),
            other => Err(Self::unexpected(request, other)),
        }
    }

    pub async fn create_room(&self, room: Room) -> Result<(), StoreError> {
        let code = room.code.clone();
        let response = self.call(StoreRequest::CreateRoom { room }).await?;
        Self::expect_ok("create_room", response, Some(&code))
    }

    pub async fn fetch_room(&self, code: &RoomCode) -> Result<Option<Room>, StoreError> {
        let response = self
            .call(StoreRequest::FetchRoom { code: code.clone() })
            .await?;
        match response {
            StoreResponse::Room { room } => Ok(room),
            StoreResponse::Error { code: c, message } => {
                Err(Self::remote_error(c, message, Some(code)))
            }
            other => Err(Self::unexpected("fetch_room", other)),
        }
    }

    pub async fn upsert_members(
        &self,
        code: &RoomCode,
        players: Vec<Player>,
    ) -> Result<(), StoreError> {
        let response = self
            .call(StoreRequest::UpsertMembers {
                code: code.clone(),
                players,
            })
            .await?;
        Self::expect_ok("upsert_members", response, Some(code))
    }

    pub async fn patch_room(&self, code: &RoomCode, patch: RoomPatch) -> Result<(), StoreError> {
        let response = self
            .call(StoreRequest::PatchRoom {
                code: code.clone(),
                patch,
            })
            .await?;
        Self::expect_ok("patch_room", response, Some(code))
    }

    pub async fn fetch_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        let response = self
            .call(StoreRequest::FetchProfile { uid: uid.to_string() })
            .await?;
        match response {
            StoreResponse::Profile { profile } => Ok(profile),
            StoreResponse::Error { code, message } => Err(Self::remote_error(code, message, None)),
            other => Err(Self::unexpected("fetch_profile", other)),
        }
    }

    pub async fn put_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        let response = self.call(StoreRequest::PutProfile { profile }).await?;
        Self::expect_ok("put_profile", response, None)
    }

    pub async fn ping(&self) -> Result<String, StoreError> {
        match self.call(StoreRequest::Ping).await? {
            StoreResponse::Pong { version } => Ok(version),
            other => Err(Self::unexpected("ping", other)),
        }
    }
}

// -- Repository --

pub enum Backend {
    Remote(RemoteStore),
    Local(LocalStore),
}

impl Backend {
    pub fn describe(&self) -> String {
        match self {
            Backend::Remote(store) => format!("remote store at {}", store.addr()),
            Backend::Local(_) => "local store".to_string(),
        }
    }
}

/// Run `$call` against the primary backend, then against the local fallback
/// when the primary is unreachable and the policy allows it.
macro_rules! with_fallback {
    ($repo:ident, $op:literal, $store:ident => $call:expr) => {{
        let primary = match &$repo.primary {
            Backend::Remote($store) => $call.await,
            Backend::Local($store) => $call.await,
        };
        match primary {
            Err(err) if err.is_unavailable() => match (&$repo.policy, &$repo.fallback) {
                (FallbackPolicy::Local, Some($store)) => {
                    $repo.note_degraded($op, &err);
                    $call.await
                }
                _ => Err(err),
            },
            other => other,
        }
    }};
}

/// Room and profile persistence behind one interface. Failures are returned
/// to the caller; none are retried.
pub struct RoomRepository {
    primary: Backend,
    fallback: Option<LocalStore>,
    policy: FallbackPolicy,
    degraded: AtomicBool,
}

impl RoomRepository {
    pub fn new(primary: Backend, fallback: Option<LocalStore>, policy: FallbackPolicy) -> Self {
        Self {
            primary,
            fallback,
            policy,
            degraded: AtomicBool::new(false),
        }
    }

    pub fn local(store: LocalStore) -> Self {
        Self::new(Backend::Local(store), None, FallbackPolicy::Strict)
    }

    /// Build the repository described by `config`. With a remote backend and
    /// the local policy, the data file (if any) backs the fallback store.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let local = match &config.data_file {
            Some(path) => LocalStore::open(path).await?,
            None => LocalStore::in_memory(),
        };
        let repo = match &config.backend {
            BackendKind::Local => Self::local(local),
            BackendKind::Remote { addr } => {
                let fallback = match config.fallback {
                    FallbackPolicy::Local => Some(local),
                    FallbackPolicy::Strict => None,
                };
                Self::new(Backend::Remote(RemoteStore::new(addr.clone())), fallback, config.fallback)
            }
        };
        tracing::info!(
            "Using {} (fallback: {})",
            repo.primary.describe(),
            repo.policy
        );
        Ok(repo)
    }

    pub fn backend(&self) -> &Backend {
        &self.primary
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn note_degraded(&self, op: &str, err: &StoreError) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!("{} failed ({}); falling back to local store", op, err);
        } else {
            tracing::debug!("{} served from local store ({})", op, err);
        }
    }

    // -- Rooms --

    /// Write a fresh room with an empty roster and return its code.
    pub async fn create(
        &self,
        creator_id: &str,
        max_rounds: u32,
        rng: &mut impl Rng,
    ) -> Result<RoomCode, StoreError> {
        let code = RoomCode::generate(rng);
        let room = Room::new(code.clone(), creator_id, max_rounds);
        with_fallback!(self, "create_room", store => store.create_room(room.clone()))?;
        tracing::info!("Created room {} for {}", code, creator_id);
        Ok(code)
    }

    pub async fn fetch(&self, code: &RoomCode) -> Result<Option<Room>, StoreError> {
        with_fallback!(self, "fetch_room", store => store.fetch_room(code))
    }

    pub async fn upsert_members(
        &self,
        code: &RoomCode,
        players: Vec<Player>,
    ) -> Result<(), StoreError> {
        with_fallback!(self, "upsert_members", store => store.upsert_members(code, players.clone()))
    }

    pub async fn patch(&self, code: &RoomCode, patch: RoomPatch) -> Result<(), StoreError> {
        with_fallback!(self, "patch_room", store => store.patch_room(code, patch.clone()))
    }

    /// Upsert `player` into the roster and return the room as stored.
    pub async fn join(&self, code: &RoomCode, player: Player) -> Result<Room, StoreError> {
        let player_id = player.id.clone();
        self.upsert_members(code, vec![player]).await?;
        let room = self
            .fetch(code)
            .await?
            .ok_or_else(|| StoreError::RoomNotFound(code.clone()))?;
        tracing::info!("{} joined room {}", player_id, code);
        Ok(room)
    }

    /// Fetch, add, then patch the whole roster. Concurrent writers may
    /// overwrite each other; the last patch wins.
    pub async fn award_score(
        &self,
        code: &RoomCode,
        player_id: &str,
        points: u32,
    ) -> Result<Option<u32>, StoreError> {
        let mut room = self
            .fetch(code)
            .await?
            .ok_or_else(|| StoreError::RoomNotFound(code.clone()))?;
        let Some(total) = room.add_score(player_id, points) else {
            return Ok(None);
        };
        self.patch(code, RoomPatch::players(room.players)).await?;
        tracing::debug!("Awarded {} to {} in {} (now {})", points, player_id, code, total);
        Ok(Some(total))
    }

    // -- Profiles --

    pub async fn fetch_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        with_fallback!(self, "fetch_profile", store => store.fetch_profile(uid))
    }

    pub async fn put_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        with_fallback!(self, "put_profile", store => store.put_profile(profile.clone()))
    }

    /// Return the stored profile, creating it on first sign-in.
    pub async fn ensure_profile(&self, identity: &Identity) -> Result<UserProfile, StoreError> {
        if let Some(profile) = self.fetch_profile(&identity.uid).await? {
            return Ok(profile);
        }
        let profile = UserProfile::for_identity(identity);
        self.put_profile(&profile).await?;
        tracing::info!("Created profile for {}", identity.uid);
        Ok(profile)
    }

    /// Record a finished game for `uid` from the final roster.
    pub async fn record_game(
        &self,
        identity: &Identity,
        final_roster: &[Player],
    ) -> Result<UserProfile, StoreError> {
        let mut profile = self.ensure_profile(identity).await?;
        if profile.record_final_roster(final_roster) {
            self.put_profile(&profile).await?;
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn code(s: &str) -> RoomCode {
        RoomCode::parse(s).unwrap()
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("doodle-{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    /// An address nothing is listening on.
    async fn dead_addr() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }

    #[test]
    fn test_documents_create_rejects_duplicate() {
        let mut docs = Documents::new();
        docs.create_room(Room::with_default_rounds(code("DOC001"), "a")).unwrap();
        let err = docs
            .create_room(Room::with_default_rounds(code("DOC001"), "b"))
            .unwrap_err();
        assert!(matches!(err, StoreError::RoomExists(_)));
        assert_eq!(docs.fetch_room(&code("DOC001")).unwrap().creator_id, "a");
    }

    #[test]
    fn test_documents_missing_room() {
        let mut docs = Documents::new();
        assert!(docs.fetch_room(&code("NOPE00")).is_none());
        assert!(matches!(
            docs.patch_room(&code("NOPE00"), RoomPatch::start()),
            Err(StoreError::RoomNotFound(_))
        ));
        assert!(matches!(
            docs.upsert_members(&code("NOPE00"), vec![Player::new("a", "A")]),
            Err(StoreError::RoomNotFound(_))
        ));
    }

    #[test]
    fn test_documents_upsert_full_is_atomic() {
        let mut docs = Documents::new();
        docs.create_room(Room::with_default_rounds(code("FULL01"), "p0")).unwrap();
        let seven: Vec<Player> = (0..7).map(|i| Player::new(format!("p{}", i), "P")).collect();
        docs.upsert_members(&code("FULL01"), seven).unwrap();

        let overflow = vec![Player::new("x", "X"), Player::new("y", "Y")];
        let err = docs.upsert_members(&code("FULL01"), overflow).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RoomFull);
        assert_eq!(docs.fetch_room(&code("FULL01")).unwrap().players.len(), 7);
    }

    #[tokio::test]
    async fn test_local_store_persists_to_file() {
        let path = temp_file("persist");
        {
            let store = LocalStore::open(&path).await.unwrap();
            store
                .create_room(Room::with_default_rounds(code("FILE01"), "alice"))
                .await
                .unwrap();
            store
                .upsert_members(&code("FILE01"), vec![Player::new("alice", "Alice")])
                .await
                .unwrap();
        }

        let reopened = LocalStore::open(&path).await.unwrap();
        let room = reopened.fetch_room(&code("FILE01")).await.unwrap().unwrap();
        assert_eq!(room.players.len(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_repository_create_and_join() {
        let repo = RoomRepository::local(LocalStore::in_memory());
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let code = repo.create("alice", 3, &mut rng).await.unwrap();

        let room = repo.fetch(&code).await.unwrap().unwrap();
        assert!(room.players.is_empty());
        assert_eq!(room.round, 1);
        assert_eq!(room.max_rounds, 3);
        assert!(!room.started);

        repo.join(&code, Player::new("alice", "Alice")).await.unwrap();
        let room = repo.join(&code, Player::new("bob", "Bob")).await.unwrap();
        assert_eq!(room.players.len(), 2);

        let missing = repo.join(&RoomCode::parse("ZZZZZZ").unwrap(), Player::new("c", "C")).await;
        assert!(matches!(missing, Err(StoreError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_award_score_read_modify_write() {
        let repo = RoomRepository::local(LocalStore::in_memory());
        let mut rng = rand::rngs::StdRng::seed_from_u64(4);
        let code = repo.create("alice", 1, &mut rng).await.unwrap();
        repo.join(&code, Player::new("bob", "Bob")).await.unwrap();

        assert_eq!(repo.award_score(&code, "bob", 60).await.unwrap(), Some(60));
        assert_eq!(repo.award_score(&code, "bob", 10).await.unwrap(), Some(70));
        assert_eq!(repo.award_score(&code, "ghost", 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let repo = RoomRepository::local(LocalStore::in_memory());
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let code = repo.create("alice", 1, &mut rng).await.unwrap();
        repo.join(&code, Player::new("alice", "Alice")).await.unwrap();
        repo.join(&code, Player::new("bob", "Bob")).await.unwrap();

        // Two clients read the same snapshot, then write in turn.
        let mut first = repo.fetch(&code).await.unwrap().unwrap();
        let mut second = first.clone();
        first.add_score("alice", 30);
        second.add_score("bob", 20);
        repo.patch(&code, RoomPatch::players(first.players)).await.unwrap();
        repo.patch(&code, RoomPatch::players(second.players)).await.unwrap();

        let stored = repo.fetch(&code).await.unwrap().unwrap();
        assert_eq!(stored.player("alice").unwrap().score, 0);
        assert_eq!(stored.player("bob").unwrap().score, 20);
    }

    #[tokio::test]
    async fn test_unreachable_remote_falls_back_to_local() {
        let config = StoreConfig {
            backend: BackendKind::Remote {
                addr: dead_addr().await,
            },
            fallback: FallbackPolicy::Local,
            data_file: None,
        };
        let repo = RoomRepository::open(&config).await.unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(6);

        let code = repo.create("alice", 3, &mut rng).await.unwrap();
        assert!(repo.is_degraded());
        assert!(repo.fetch(&code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_remote_strict_fails() {
        let config = StoreConfig {
            backend: BackendKind::Remote {
                addr: dead_addr().await,
            },
            fallback: FallbackPolicy::Strict,
            data_file: None,
        };
        let repo = RoomRepository::open(&config).await.unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        let err = repo.create("alice", 3, &mut rng).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(!repo.is_degraded());
    }

    #[tokio::test]
    async fn test_profiles() {
        let repo = RoomRepository::local(LocalStore::in_memory());
        let alice = Identity::new("alice", "Alice");

        let created = repo.ensure_profile(&alice).await.unwrap();
        assert_eq!(created.games_played, 0);

        let mut winner = alice.as_player();
        winner.score = 90;
        let loser = Player::new("bob", "Bob");
        let updated = repo.record_game(&alice, &[winner, loser]).await.unwrap();
        assert_eq!(updated.games_played, 1);
        assert_eq!(updated.games_won, 1);
        assert_eq!(updated.total_score, 90);

        let stored = repo.fetch_profile("alice").await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }
}
