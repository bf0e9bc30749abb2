//! WebSocket connection handlers.
//!
//! Each socket is split into a write pump (`pusher_loop`, draining the
//! connection's outbound queue) and a read pump (inline in `handle_socket`,
//! decoding frames and routing them to the hub or to the bound room).

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::{sync::mpsc, time::Instant};

use crate::{
    domain::{
        ClientRequest, GameError, GameEvent, PlayerAction, PlayerId, PusherChannel, RoomCode,
        RoomHandle,
    },
    infrastructure::{dto::websocket::ClientEnvelope, message_pusher::encode_event},
    ui::state::AppState,
    usecase::Hub,
};

/// Largest inbound frame accepted.
const MAX_MESSAGE_SIZE: usize = 64 * 1024;
/// Interval between keep-alive pings. Must be shorter than `READ_TIMEOUT`.
const PING_PERIOD: Duration = Duration::from_secs(54);
/// A connection that sends nothing (not even a pong) for this long is dropped.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-socket state owned by the read pump.
struct Connection {
    id: PlayerId,
    hub: Hub,
    /// Strong end of the outbound queue while unbound. On a successful join it
    /// moves into the room's roster, so the room decides when the queue closes.
    outbound: Option<PusherChannel>,
    room: Option<RoomHandle>,
}

impl Connection {
    async fn handle_text(&mut self, text: &str) {
        let envelope: ClientEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Malformed frame from '{}': {}", self.id, e);
                return;
            }
        };

        let kind = envelope.kind.clone();
        let request = match envelope.into_request() {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::debug!("Ignoring '{}' frame from '{}'", kind, self.id);
                return;
            }
            Err(e) => {
                tracing::warn!("Invalid '{}' payload from '{}': {}", kind, self.id, e);
                return;
            }
        };

        match request {
            ClientRequest::CreateRoom { player_name } => self.create_room(player_name).await,
            ClientRequest::JoinRoom {
                room_code,
                player_name,
            } => self.join_room(room_code, player_name).await,
            ClientRequest::Room(action) => self.dispatch(action).await,
        }
    }

    async fn create_room(&mut self, player_name: String) {
        let Some(outbound) = self.outbound.clone() else {
            tracing::debug!("'{}' is already in a room, ignoring create-room", self.id);
            return;
        };

        match self
            .hub
            .create_room(self.id.clone(), player_name, outbound)
            .await
        {
            Ok(room) => self.bind(room),
            Err(e) => {
                tracing::error!("Failed to create a room for '{}': {}", self.id, e);
                self.reply_error(e);
            }
        }
    }

    async fn join_room(&mut self, room_code: String, player_name: String) {
        let Some(outbound) = self.outbound.clone() else {
            tracing::debug!("'{}' is already in a room, ignoring join-room", self.id);
            return;
        };

        let room = match RoomCode::new(room_code) {
            Ok(code) => self.hub.get_room(&code).await,
            Err(_) => None,
        };
        let Some(room) = room else {
            self.reply_error(GameError::RoomNotFound);
            return;
        };

        match room.join(self.id.clone(), player_name, outbound).await {
            Ok(()) => self.bind(room),
            Err(e) => self.reply_error(e),
        }
    }

    fn bind(&mut self, room: RoomHandle) {
        self.outbound = None;
        tracing::info!("Client '{}' bound to room {}", self.id, room.code());
        self.room = Some(room);
    }

    async fn dispatch(&self, action: PlayerAction) {
        let Some(room) = &self.room else {
            tracing::debug!("'{}' is not in a room, ignoring {:?}", self.id, action);
            return;
        };
        if !room.dispatch(self.id.clone(), action).await {
            tracing::debug!("Room {} is gone", room.code());
        }
    }

    /// Only an unbound connection is answered directly; a bound one hears from its room.
    fn reply_error(&self, message: impl ToString) {
        let Some(outbound) = &self.outbound else {
            return;
        };
        match encode_event(&GameEvent::error(message)) {
            Ok(frame) => {
                if outbound.try_send(frame).is_err() {
                    tracing::warn!("Dropped error reply to '{}'", self.id);
                }
            }
            Err(e) => tracing::error!("{}", e),
        }
    }
}

/// Spawns the write pump: drains the outbound queue into the socket and keeps
/// the connection alive with periodic pings.
///
/// The pump ends when the queue closes (the connection was evicted, or the
/// read pump finished) or when the socket refuses a write.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ping = tokio::time::interval_at(Instant::now() + PING_PERIOD, PING_PERIOD);

        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(frame) = frame else {
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    };
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let id = PlayerId::generate();
    let (tx, rx) = mpsc::channel(state.config.outbound_queue_capacity);
    let (sender, mut receiver) = socket.split();

    state.hub.register(id.clone()).await;
    tracing::info!("Client '{}' connected", id);

    let mut connection = Connection {
        id,
        hub: state.hub.clone(),
        outbound: Some(tx),
        room: None,
    };
    let mut send_task = pusher_loop(rx, sender);

    loop {
        tokio::select! {
            _ = &mut send_task => break,
            frame = tokio::time::timeout(READ_TIMEOUT, receiver.next()) => {
                let msg = match frame {
                    Err(_) => {
                        tracing::info!("Client '{}' timed out", connection.id);
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        tracing::warn!("WebSocket error from '{}': {}", connection.id, e);
                        break;
                    }
                    Ok(Some(Ok(msg))) => msg,
                };

                match msg {
                    Message::Text(text) => connection.handle_text(text.as_str()).await,
                    Message::Close(_) => {
                        tracing::info!("Client '{}' requested close", connection.id);
                        break;
                    }
                    Message::Binary(_) => {
                        tracing::warn!("Ignoring binary frame from '{}'", connection.id);
                    }
                    // Ping/pong is handled automatically by the WebSocket protocol
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
        }
    }

    send_task.abort();

    let Connection { id, hub, room, .. } = connection;
    tracing::info!("Client '{}' disconnected", id);
    hub.connection_closed(id, room).await;
}
