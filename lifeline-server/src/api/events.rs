//! `GET /events/ws` — the private notification channel.
//!
//! Upgrades the connection, joins the account's channel on the hub
//! with an identity snapshot (role, blood group, availability), and
//! relays [`ServerEvent`] frames until either side disconnects. Missed
//! events are not replayed.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use lifeline_core::dispatch::ClientProfile;
use lifeline_core::entities::Role;
use lifeline_sdk::objects::ws::WsCloseCode;
use lifeline_sdk::objects::ServerEvent;

use super::extractors::Identity;
use super::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(events_ws))
}

async fn events_ws(
    State(state): State<AppState>,
    Identity(identity): Identity,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    // Snapshot the eligibility attributes while we still can fail with
    // a proper HTTP status.
    let (blood_group, is_available) = match identity.role {
        Role::Donor => state
            .store
            .donor_profile(identity.account_id)
            .await
            .map_err(ApiError::Core)?
            .map(|d| (Some(d.blood_group), d.is_available))
            .unwrap_or((None, false)),
        Role::Driver => state
            .store
            .driver_profile(identity.account_id)
            .await
            .map_err(ApiError::Core)?
            .map(|d| (None, d.is_available))
            .unwrap_or((None, false)),
        Role::Patient | Role::Admin => (None, false),
    };

    let profile = ClientProfile {
        account_id: identity.account_id,
        role: identity.role,
        blood_group,
        is_available,
    };
    let app_state = state.clone();
    Ok(ws.on_upgrade(move |socket| handle_events_ws(socket, app_state, profile)))
}

/// Background task that drives a single WebSocket connection.
async fn handle_events_ws(mut socket: WebSocket, state: AppState, profile: ClientProfile) {
    let subscription = match state.hub.join(profile).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, account_id = %profile.account_id, "WS: hub join failed");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: WsCloseCode::HUB_UNAVAILABLE,
                    reason: "notification hub unavailable".into(),
                })))
                .await;
            return;
        }
    };
    let connection_id = subscription.connection_id;
    let mut events = subscription.events;

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => {
                        if send_json(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.hub.leave(profile.account_id, connection_id).await;
    let _ = socket.send(Message::Close(None)).await;
}

/// Serialize `event` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = serde_json::to_string(event).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
