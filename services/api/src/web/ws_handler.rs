//! services/api/src/web/ws_handler.rs
//!
//! The entry point and control loop for a discovery WebSocket connection.
//! Each connection owns one session actor; closing the socket disposes it.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use discovery_core::{
    controller::{SessionCommand, SessionController, SessionEvent, SessionHandle},
    domain::{AccessToken, ActionKind, DiscoveryRequest},
    session::SessionSnapshot,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>, // from the token middleware
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, token))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, token: AccessToken) {
    info!("New discovery WebSocket connection established.");

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // --- 1. Initialization Phase ---
    let mut request = match receiver.next().await {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Start {
                workout,
                artist_names,
            }) => DiscoveryRequest {
                artist_names,
                workout,
            },
            _ => {
                error!("First message was not a valid Start message.");
                send_message(&ws_sender, &ServerMessage::Error {
                    message: "Expected a start message.".to_string(),
                })
                .await;
                return;
            }
        },
        _ => {
            error!("Client disconnected before sending Start message.");
            return;
        }
    };

    let tracks = match app_state.backend.discover_tracks(&token, &request).await {
        Ok(tracks) => tracks,
        Err(e) => {
            error!("Failed to load discovery tracks: {:?}", e);
            send_message(&ws_sender, &ServerMessage::Error {
                message: format!("Failed to load tracks: {}", e),
            })
            .await;
            return;
        }
    };
    info!(workout = %request.workout, tracks = tracks.len(), "Discovery tracks loaded");

    let mut session = SessionController::spawn(
        app_state.backend.clone(),
        token.clone(),
        tracks,
        app_state.config.swipe_threshold,
        app_state.shutdown.child_token(),
    );
    let forwarder = spawn_forwarder(&mut session, ws_sender.clone());

    // --- 2. Main Message Loop ---
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                let keep_going = handle_text_message(
                    &text,
                    &app_state,
                    &token,
                    &session,
                    &ws_sender,
                    &mut request,
                )
                .await;
                if !keep_going {
                    break;
                }
            }
            Some(Ok(Message::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    session.dispose().await;
    forwarder.abort();
    info!("Discovery WebSocket connection closed.");
}

/// Handles one client message. Returns `false` when the session actor is gone.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    token: &AccessToken,
    session: &SessionHandle,
    ws_sender: &WsSender,
    request: &mut DiscoveryRequest,
) -> bool {
    let command = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Drag { delta }) => SessionCommand::DragBy(delta),
        Ok(ClientMessage::DragRelease) => SessionCommand::Release,
        Ok(ClientMessage::Like) => SessionCommand::Decide(ActionKind::Like),
        Ok(ClientMessage::Dislike) => SessionCommand::Decide(ActionKind::Dislike),
        Ok(ClientMessage::Restart) => {
            info!("Restart requested; fetching a fresh track list.");
            match reload(app_state, token, request, ws_sender).await {
                Some(tracks) => SessionCommand::Load { tracks, restart: true },
                None => return true,
            }
        }
        Ok(ClientMessage::Start {
            workout,
            artist_names,
        }) => {
            *request = DiscoveryRequest {
                artist_names,
                workout,
            };
            match reload(app_state, token, request, ws_sender).await {
                // Same list resumes; anything else starts over.
                Some(tracks) => SessionCommand::Load { tracks, restart: false },
                None => return true,
            }
        }
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            return true;
        }
    };

    if session.send(command).await.is_err() {
        error!("Discovery session actor is no longer running.");
        return false;
    }
    true
}

async fn reload(
    app_state: &Arc<AppState>,
    token: &AccessToken,
    request: &DiscoveryRequest,
    ws_sender: &WsSender,
) -> Option<Vec<discovery_core::domain::Track>> {
    match app_state.backend.discover_tracks(token, request).await {
        Ok(tracks) => Some(tracks),
        Err(e) => {
            error!("Failed to reload discovery tracks: {:?}", e);
            send_message(ws_sender, &ServerMessage::Error {
                message: format!("Failed to load tracks: {}", e),
            })
            .await;
            None
        }
    }
}

/// Streams snapshots and events from the session actor to the socket.
fn spawn_forwarder(session: &mut SessionHandle, ws_sender: WsSender) -> JoinHandle<()> {
    let snapshots = session.subscribe();
    let events = session.take_events();
    tokio::spawn(forward_updates(snapshots, events, ws_sender))
}

async fn forward_updates(
    mut snapshots: watch::Receiver<SessionSnapshot>,
    mut events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    ws_sender: WsSender,
) {
    let initial = snapshots.borrow_and_update().clone();
    if !send_message(&ws_sender, &ServerMessage::from(initial)).await {
        return;
    }

    loop {
        let message = tokio::select! {
            changed = snapshots.changed() => match changed {
                Ok(()) => ServerMessage::from(snapshots.borrow_and_update().clone()),
                Err(_) => break,
            },
            event = next_event(&mut events) => match event {
                Some(event) => ServerMessage::from(event),
                None => {
                    events = None;
                    continue;
                }
            },
        };
        if !send_message(&ws_sender, &message).await {
            break;
        }
    }
}

async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<SessionEvent>>,
) -> Option<SessionEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Serializes and sends one message. Returns `false` if the client is gone.
async fn send_message(ws_sender: &WsSender, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    if ws_sender.lock().await.send(Message::Text(json.into())).await.is_err() {
        warn!("Failed to send message to client. Client may have disconnected.");
        return false;
    }
    true
}
