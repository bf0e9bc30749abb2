//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - ルームのメンバーごとの送信キュー（`PusherChannel`）を管理
//! - ドメインイベントを JSON フレームにエンコードしてキューに積む
//!
//! WebSocket の生成と送信キューの排出は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装はキューに積むだけで、決して待ちません。

use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;

use crate::{
    domain::{GameEvent, MessagePushError, MessagePusher, PlayerId, PusherChannel},
    infrastructure::dto::websocket::ServerMessage,
};

/// Encode a domain event as an outbound text frame.
pub fn encode_event(event: &GameEvent) -> Result<String, MessagePushError> {
    serde_json::to_string(&ServerMessage::from(event))
        .map_err(|e| MessagePushError::Encode(e.to_string()))
}

/// One instance per room, owned by the room's session task.
#[derive(Debug, Default)]
pub struct WebSocketMessagePusher {
    /// Key: player id, Value: the member's outbound queue
    clients: HashMap<PlayerId, PusherChannel>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn enqueue(&self, client_id: &PlayerId, frame: String) -> Result<(), MessagePushError> {
        let sender = self
            .clients
            .get(client_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(client_id.to_string()))?;

        sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => MessagePushError::QueueFull(client_id.to_string()),
            TrySendError::Closed(_) => MessagePushError::QueueClosed(client_id.to_string()),
        })
    }
}

impl MessagePusher for WebSocketMessagePusher {
    fn register_client(&mut self, client_id: PlayerId, sender: PusherChannel) {
        tracing::debug!("Client '{}' registered to MessagePusher", client_id);
        self.clients.insert(client_id, sender);
    }

    fn unregister_client(&mut self, client_id: &PlayerId) -> bool {
        let removed = self.clients.remove(client_id).is_some();
        if removed {
            tracing::debug!("Client '{}' unregistered from MessagePusher", client_id);
        }
        removed
    }

    fn push_to(&self, client_id: &PlayerId, event: &GameEvent) -> Result<(), MessagePushError> {
        let frame = encode_event(event)?;
        self.enqueue(client_id, frame)?;
        tracing::debug!("Pushed {} to client '{}'", event.kind(), client_id);
        Ok(())
    }

    fn broadcast(&self, targets: &[PlayerId], event: &GameEvent) -> Vec<PlayerId> {
        let frame = match encode_event(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("{}", e);
                return Vec::new();
            }
        };

        let mut refused = Vec::new();
        for target in targets {
            match self.enqueue(target, frame.clone()) {
                Ok(()) => {}
                // ルームの名簿と食い違うだけなので追放はしない
                Err(MessagePushError::ClientNotFound(_)) => {
                    tracing::warn!("Client '{}' not found during broadcast, skipping", target);
                }
                Err(e) => {
                    tracing::warn!("Failed to broadcast {}: {}", event.kind(), e);
                    refused.push(target.clone());
                }
            }
        }
        refused
    }
}
