use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::profile::UserProfile;
use crate::room::{Player, Room, RoomCode, RoomPatch};

pub const PROTOCOL_VERSION: &str = "0.1.0";

// -- Framing --

pub type Transport = Framed<TcpStream, LengthDelimitedCodec>;

/// A full eight-player room document is a few KB; leave generous headroom.
pub const MAX_FRAME_LENGTH: usize = 256 * 1024;

pub fn framed_transport(stream: TcpStream) -> Transport {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_framed(stream)
}

// -- Client -> Store --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreRequest {
    /// Insert a freshly built room. Fails if the code is already taken.
    CreateRoom { room: Room },
    FetchRoom { code: RoomCode },
    /// Join semantics applied store-side, one player at a time.
    UpsertMembers { code: RoomCode, players: Vec<Player> },
    PatchRoom { code: RoomCode, patch: RoomPatch },

    FetchProfile { uid: String },
    PutProfile { profile: UserProfile },

    Ping,
}

impl StoreRequest {
    pub fn name(&self) -> &'static str {
        match self {
            StoreRequest::CreateRoom { .. } => "create_room",
            StoreRequest::FetchRoom { .. } => "fetch_room",
            StoreRequest::UpsertMembers { .. } => "upsert_members",
            StoreRequest::PatchRoom { .. } => "patch_room",
            StoreRequest::FetchProfile { .. } => "fetch_profile",
            StoreRequest::PutProfile { .. } => "put_profile",
            StoreRequest::Ping => "ping",
        }
    }
}

// -- Store -> Client --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreResponse {
    Room { room: Option<Room> },
    Profile { profile: Option<UserProfile> },
    Ok,
    Pong { version: String },
    Error { code: ErrorCode, message: String },
}

impl StoreResponse {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        StoreResponse::Error {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    RoomNotFound,
    RoomExists,
    RoomFull,
    InvalidRequest,
    InternalError,
}

// -- Serialization helpers --

pub fn serialize_message<T: Serialize>(msg: &T) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_vec(msg)?;
    Ok(Bytes::from(json))
}

pub fn deserialize_message<T: for<'de> Deserialize<'de>>(
    data: &[u8],
) -> Result<T, serde_json::Error> {
    serde_json::from_slice(data)
}

// -- Transport helpers --

pub async fn send_message<T: Serialize>(
    transport: &mut Transport,
    msg: &T,
) -> anyhow::Result<()> {
    let bytes = serialize_message(msg).map_err(|e| anyhow::anyhow!("serialize error: {}", e))?;
    transport
        .send(bytes)
        .await
        .map_err(|e| anyhow::anyhow!("send error: {}", e))
}

pub async fn recv_message<T: for<'de> Deserialize<'de>>(
    transport: &mut Transport,
) -> anyhow::Result<Option<T>> {
    match transport.next().await {
        Some(Ok(frame)) => {
            let msg = deserialize_message(&frame)
                .map_err(|e| anyhow::anyhow!("deserialize error: {}", e))?;
            Ok(Some(msg))
        }
        Some(Err(e)) => Err(anyhow::anyhow!("recv error: {}", e)),
        None => Ok(None),
    }
}
