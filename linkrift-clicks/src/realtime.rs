//! Realtime click fan-out.
//!
//! Socket.IO clients authenticate with a `?token=` JWT whose subject is
//! their workspace id and join the `workspace:<id>` room; the processor
//! emits one `click` message per consumed event into the matching room.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use socketioxide::extract::{SocketRef, State};
use socketioxide::SocketIo;
use uuid::Uuid;

use crate::models::RealtimeClick;
use crate::WorkerState;

/// JWT claims for the realtime handshake. `sub` is the workspace id; the
/// management plane mints these tokens for console sessions.
#[derive(Debug, Serialize, Deserialize)]
pub struct RealtimeClaims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

pub fn workspace_room(workspace_id: Uuid) -> String {
    format!("workspace:{workspace_id}")
}

pub async fn on_connect(socket: SocketRef, State(state): State<Arc<WorkerState>>) {
    let workspace_id = match authenticate_socket(&socket, &state) {
        Ok(id) => id,
        Err(msg) => {
            tracing::warn!(error = %msg, "realtime socket auth failed");
            let _ = socket.emit(
                "error",
                &ErrorPayload {
                    code: "AUTH_FAILED".into(),
                    message: msg,
                },
            );
            socket.disconnect().ok();
            return;
        }
    };

    socket.extensions.insert(workspace_id);
    socket.join(workspace_room(workspace_id)).ok();

    tracing::info!(workspace_id = %workspace_id, sid = %socket.id, "realtime subscriber connected");

    let _ = socket.emit(
        "connected",
        &serde_json::json!({ "workspace_id": workspace_id }),
    );
}

/// Emit a click into the workspace's room. No subscribers is the normal
/// case and not an error.
pub fn emit_click(io: &SocketIo, workspace_id: Uuid, message: &RealtimeClick) {
    if let Err(e) = io.to(workspace_room(workspace_id)).emit("click", message) {
        tracing::debug!(error = %e, "realtime emit failed");
    }
}

fn authenticate_socket(socket: &SocketRef, state: &Arc<WorkerState>) -> Result<Uuid, String> {
    let connect_info = socket.req_parts();

    let query = connect_info.uri.query().unwrap_or_default();
    let token = query
        .split('&')
        .find_map(|pair| {
            let mut split = pair.splitn(2, '=');
            let key = split.next()?;
            let value = split.next()?;
            if key == "token" {
                Some(value.to_string())
            } else {
                None
            }
        })
        .ok_or_else(|| "missing token query parameter".to_string())?;

    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = jsonwebtoken::decode::<RealtimeClaims>(
        &token,
        &jsonwebtoken::DecodingKey::from_secret(state.config.realtime_jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| format!("invalid token: {e}"))?;

    Uuid::parse_str(&token_data.claims.sub).map_err(|_| "token subject is not a workspace id".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_names_are_workspace_scoped() {
        let id = Uuid::nil();
        assert_eq!(
            workspace_room(id),
            "workspace:00000000-0000-0000-0000-000000000000"
        );
    }
}
