//! UseCase: Hub（接続レジストリとルームのライフサイクル管理）
//!
//! The hub owns the table of live connections and is the only place that
//! retires rooms from the repository. Room creation itself is not serialized
//! through the hub loop: the repository insert is atomic and a code collision
//! is simply retried with a fresh code.

use std::{collections::HashMap, sync::Arc};

use lgtm_shared::time::Clock;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};

use crate::domain::{
    CreateRoomError, GameError, MessagePusher, PlayerId, PusherChannel, RoomCode,
    RoomCodeFactory, RoomCommand, RoomHandle, RoomRepository, TaskProvider, Timestamp,
};

use super::{config::GameConfig, room_session::RoomSession};

/// Builds a fresh, empty pusher for each new room.
pub type PusherFactory = Arc<dyn Fn() -> Box<dyn MessagePusher> + Send + Sync>;

const ROOM_CODE_ATTEMPTS: usize = 16;

#[derive(Debug)]
pub enum HubCommand {
    Register {
        connection_id: PlayerId,
        connected_at: Timestamp,
    },
    /// The connection is gone. `room` is the room it was bound to, if any.
    Unregister {
        connection_id: PlayerId,
        room: Option<RoomHandle>,
    },
    /// Sent by a room once its roster has emptied and its loop has stopped.
    RoomClosed {
        code: RoomCode,
    },
    ConnectionCount {
        reply: oneshot::Sender<usize>,
    },
}

struct HubContext {
    repository: Arc<dyn RoomRepository>,
    tasks: Arc<dyn TaskProvider>,
    clock: Arc<dyn Clock>,
    pusher_factory: PusherFactory,
    config: GameConfig,
}

/// Cloneable handle to the hub.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::Sender<HubCommand>,
    context: Arc<HubContext>,
}

impl Hub {
    /// Start the hub loop. Must be called inside a Tokio runtime.
    pub fn spawn(
        repository: Arc<dyn RoomRepository>,
        tasks: Arc<dyn TaskProvider>,
        clock: Arc<dyn Clock>,
        pusher_factory: PusherFactory,
        config: GameConfig,
    ) -> Self {
        let (commands, receiver) = mpsc::channel(config.hub_queue_capacity);
        let context = Arc::new(HubContext {
            repository,
            tasks,
            clock,
            pusher_factory,
            config,
        });

        tokio::spawn(run_hub(receiver, context.repository.clone()));

        Self { commands, context }
    }

    pub fn config(&self) -> &GameConfig {
        &self.context.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.context.clock
    }

    /// Create a room under a fresh code with `creator` as its first member.
    ///
    /// The creator's join is queued before the room loop starts, so a room is
    /// never left running without ever having had a member.
    pub async fn create_room(
        &self,
        creator: PlayerId,
        player_name: String,
        sender: PusherChannel,
    ) -> Result<RoomHandle, CreateRoomError> {
        let created_at = Timestamp::new(self.context.clock.now_millis());
        let mut attempt = 0;

        let (commands, receiver, handle) = loop {
            attempt += 1;
            let code = RoomCodeFactory::generate(&mut rand::rng());
            let (commands, receiver) = mpsc::channel(self.context.config.room_queue_capacity);
            let handle = RoomHandle::new(code, created_at, commands.clone());

            match self.context.repository.insert(handle.clone()).await {
                Ok(()) => break (commands, receiver, handle),
                Err(e) if attempt >= ROOM_CODE_ATTEMPTS => {
                    tracing::error!("Giving up on room creation after {} attempts", attempt);
                    return Err(e.into());
                }
                Err(e) => tracing::debug!("Retrying room creation: {}", e),
            }
        };

        let (reply, response) = oneshot::channel();
        let join = RoomCommand::Join {
            player_id: creator,
            player_name,
            sender,
            creator: true,
            reply,
        };
        if let Err(e) = commands.try_send(join) {
            tracing::error!("Fresh room {} refused its creator: {}", handle.code(), e);
        }

        let session = RoomSession::new(
            &handle,
            self.clone(),
            (self.context.pusher_factory)(),
            self.context.tasks.clone(),
            self.context.clock.clone(),
            self.context.config.clone(),
        );
        tokio::spawn(session.run(receiver));
        tracing::info!("Room {} created", handle.code());

        self.seat_creator(handle, response).await
    }

    /// Wait for the creator's join. On failure the room leaves the directory,
    /// and its loop ends once the last handle is dropped.
    async fn seat_creator(
        &self,
        handle: RoomHandle,
        response: oneshot::Receiver<Result<(), GameError>>,
    ) -> Result<RoomHandle, CreateRoomError> {
        let joined = response.await.unwrap_or(Err(GameError::RoomNotFound));
        if let Err(e) = joined {
            tracing::warn!("Creator could not join room {}: {}", handle.code(), e);
            self.context.repository.remove(handle.code()).await;
            return Err(e.into());
        }
        Ok(handle)
    }

    /// Look up a live room. Codes are matched exactly.
    pub async fn get_room(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.context
            .repository
            .get(code)
            .await
            .filter(|room| !room.is_closed())
    }

    pub async fn list_rooms(&self) -> Vec<RoomHandle> {
        self.context
            .repository
            .list()
            .await
            .into_iter()
            .filter(|room| !room.is_closed())
            .collect()
    }

    pub async fn register(&self, connection_id: PlayerId) {
        let connected_at = Timestamp::new(self.context.clock.now_millis());
        self.send(HubCommand::Register {
            connection_id,
            connected_at,
        })
        .await;
    }

    /// Report a closed connection. Safe to call more than once for the same id.
    pub async fn connection_closed(&self, connection_id: PlayerId, room: Option<RoomHandle>) {
        self.send(HubCommand::Unregister {
            connection_id,
            room,
        })
        .await;
    }

    pub async fn connection_count(&self) -> usize {
        let (reply, response) = oneshot::channel();
        self.send(HubCommand::ConnectionCount { reply }).await;
        response.await.unwrap_or_default()
    }

    /// Called from inside a room loop, so it never waits on the hub queue.
    pub(crate) fn room_closed(&self, code: RoomCode) {
        match self.commands.try_send(HubCommand::RoomClosed { code }) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(command)) => {
                let commands = self.commands.clone();
                tokio::spawn(async move {
                    let _ = commands.send(command).await;
                });
            }
        }
    }

    /// Called from inside a room loop after a slow consumer was dropped.
    pub(crate) fn connection_evicted(&self, connection_id: PlayerId) {
        let command = HubCommand::Unregister {
            connection_id,
            room: None,
        };
        if let Err(TrySendError::Full(HubCommand::Unregister { connection_id, .. })) =
            self.commands.try_send(command)
        {
            tracing::warn!(
                "Hub queue full, eviction of '{}' will be recorded on disconnect",
                connection_id
            );
        }
    }

    async fn send(&self, command: HubCommand) {
        if self.commands.send(command).await.is_err() {
            tracing::error!("Hub loop is not running");
        }
    }
}

async fn run_hub(mut receiver: mpsc::Receiver<HubCommand>, repository: Arc<dyn RoomRepository>) {
    let mut connections: HashMap<PlayerId, Timestamp> = HashMap::new();

    while let Some(command) = receiver.recv().await {
        match command {
            HubCommand::Register {
                connection_id,
                connected_at,
            } => {
                tracing::info!("Client '{}' registered", connection_id);
                connections.insert(connection_id, connected_at);
            }
            HubCommand::Unregister {
                connection_id,
                room,
            } => {
                if connections.remove(&connection_id).is_some() {
                    tracing::info!(
                        "Client '{}' unregistered ({} connected)",
                        connection_id,
                        connections.len()
                    );
                }
                if let Some(room) = room {
                    // The room loop may be busy; never wait on it from here.
                    if let Err(command) = room.try_leave(connection_id) {
                        tokio::spawn(async move { room.send(command).await });
                    }
                }
            }
            HubCommand::RoomClosed { code } => {
                if repository.remove(&code).await.is_some() {
                    tracing::info!("Room {} removed", code);
                }
            }
            HubCommand::ConnectionCount { reply } => {
                let _ = reply.send(connections.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lgtm_shared::time::FixedClock;

    use super::*;
    use crate::{
        domain::task_provider::MockTaskProvider,
        infrastructure::{
            message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
        },
    };

    fn create_test_hub() -> (Hub, Arc<InMemoryRoomRepository>) {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let hub = Hub::spawn(
            repository.clone(),
            Arc::new(MockTaskProvider::new()),
            Arc::new(FixedClock::new(1_700_000_000_000)),
            Arc::new(|| Box::new(WebSocketMessagePusher::new()) as Box<dyn MessagePusher>),
            GameConfig::default(),
        );
        (hub, repository)
    }

    #[tokio::test]
    async fn test_create_room_registers_live_room() {
        // テスト項目: 作成したルームがリポジトリに登録され、コードで取得できる
        // given (前提条件):
        let (hub, repository) = create_test_hub();

        // when (操作):
        let (tx, mut rx) = mpsc::channel(8);
        let room = hub
            .create_room(PlayerId::generate(), "Alice".to_string(), tx)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(repository.count().await, 1);
        assert!(rx.recv().await.unwrap().contains("room-created"));
        let found = hub.get_room(room.code()).await.unwrap();
        assert_eq!(found.code(), room.code());
        assert_eq!(found.created_at().value(), 1_700_000_000_000);
        assert_eq!(hub.list_rooms().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_creator_does_not_leave_room_behind() {
        // テスト項目: 作成者の参加が失敗した場合はエラーを返し、ルームをディレクトリに残さない
        // given (前提条件):
        let (hub, repository) = create_test_hub();
        let (commands, _receiver) = mpsc::channel(1);
        let code = RoomCode::new("ABC123".to_string()).unwrap();
        let handle = RoomHandle::new(code.clone(), Timestamp::new(0), commands);
        repository.insert(handle.clone()).await.unwrap();
        let (reply, response) = oneshot::channel();
        drop(reply);

        // when (操作):
        let result = hub.seat_creator(handle, response).await;

        // then (期待する結果):
        assert_eq!(
            result.map(|room| room.code().clone()),
            Err(CreateRoomError::CreatorRejected(GameError::RoomNotFound))
        );
        assert_eq!(repository.count().await, 0);
        assert!(hub.get_room(&code).await.is_none());
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        // テスト項目: 同じ接続の登録解除を二度行っても問題ない
        // given (前提条件):
        let (hub, _) = create_test_hub();
        let id = PlayerId::generate();
        hub.register(id.clone()).await;
        hub.register(PlayerId::generate()).await;
        assert_eq!(hub.connection_count().await, 2);

        // when (操作):
        hub.connection_closed(id.clone(), None).await;
        hub.connection_closed(id, None).await;

        // then (期待する結果):
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_room_is_removed_after_last_member_leaves() {
        // テスト項目: 最後のメンバーが切断するとルームが破棄される
        // given (前提条件):
        let (hub, repository) = create_test_hub();
        let id = PlayerId::generate();
        let (tx, _rx) = mpsc::channel(8);
        hub.register(id.clone()).await;
        let room = hub
            .create_room(id.clone(), "Alice".to_string(), tx)
            .await
            .unwrap();

        // when (操作):
        hub.connection_closed(id, Some(room.clone())).await;

        // then (期待する結果):
        tokio::time::timeout(Duration::from_secs(2), async {
            while repository.count().await > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(hub.get_room(room.code()).await.is_none());
        assert!(room.is_closed());
    }
}
