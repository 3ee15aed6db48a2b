use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::net::TcpStream;
use uuid::Uuid;

use doodle_common::protocol::{
    self, framed_transport, ErrorCode, StoreRequest, StoreResponse,
};

use crate::handler;
use crate::server::SharedState;

pub struct ConnectionInfo {
    pub peer_addr: SocketAddr,
    pub connected_at: DateTime<Utc>,
    pub requests: u64,
}

/// Serve one client: one response per request, in order, until it hangs up.
pub async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: SharedState,
) -> anyhow::Result<()> {
    let conn_id = Uuid::new_v4();
    state.connections.write().await.insert(
        conn_id,
        ConnectionInfo {
            peer_addr,
            connected_at: Utc::now(),
            requests: 0,
        },
    );

    let mut transport = framed_transport(stream);
    let result = serve_requests(conn_id, &mut transport, &state).await;

    // Cleanup
    if let Some(info) = state.connections.write().await.remove(&conn_id) {
        let elapsed = Utc::now() - info.connected_at;
        tracing::info!(
            "Client {} disconnected after {} requests ({}s)",
            info.peer_addr,
            info.requests,
            elapsed.num_seconds()
        );
    }
    result
}

async fn serve_requests(
    conn_id: Uuid,
    transport: &mut protocol::Transport,
    state: &SharedState,
) -> anyhow::Result<()> {
    loop {
        let frame = match transport.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(anyhow::anyhow!("read error: {}", e)),
            None => return Ok(()),
        };

        let response = match protocol::deserialize_message::<StoreRequest>(&frame) {
            Ok(request) => {
                if let Some(info) = state.connections.write().await.get_mut(&conn_id) {
                    info.requests += 1;
                }
                handler::handle_request(request, state).await
            }
            Err(e) => {
                tracing::warn!("Failed to parse request on {}: {}", conn_id, e);
                StoreResponse::error(ErrorCode::InvalidRequest, format!("malformed request: {}", e))
            }
        };

        protocol::send_message(transport, &response).await?;
    }
}
