//! Commands accepted by a room's serialization point, and the handle used to submit them.

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};

use super::{
    GameError,
    action::PlayerAction,
    entity::Player,
    game::GamePhase,
    message_pusher::PusherChannel,
    value_object::{PlayerId, RoomCode, Timestamp},
};

/// Which phase clock produced a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKind {
    Game,
    Voting,
}

/// Read-only view of a room, produced by the room itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub time_remaining: u32,
    pub voting_time_remaining: u32,
    pub edit_count: usize,
    pub created_at: Timestamp,
}

#[derive(Debug)]
pub enum RoomCommand {
    /// Bind a connection. `sender` moves into the roster on success.
    Join {
        player_id: PlayerId,
        player_name: String,
        sender: PusherChannel,
        creator: bool,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    Action {
        player_id: PlayerId,
        action: PlayerAction,
    },
    Tick {
        clock: ClockKind,
        ticker_id: u64,
    },
    /// Fired once the post-tally reveal delay has elapsed.
    ResolveTally {
        round: u64,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

/// Cheap, cloneable address of a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    created_at: Timestamp,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn new(code: RoomCode, created_at: Timestamp, sender: mpsc::Sender<RoomCommand>) -> Self {
        Self {
            code,
            created_at,
            sender,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Whether the room has stopped processing commands.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn downgrade(&self) -> mpsc::WeakSender<RoomCommand> {
        self.sender.downgrade()
    }

    /// Ask the room to add a player. A room that has shut down reports `RoomNotFound`.
    pub async fn join(
        &self,
        player_id: PlayerId,
        player_name: String,
        sender: PusherChannel,
    ) -> Result<(), GameError> {
        let (reply, response) = oneshot::channel();
        let command = RoomCommand::Join {
            player_id,
            player_name,
            sender,
            creator: false,
            reply,
        };
        if self.sender.send(command).await.is_err() {
            return Err(GameError::RoomNotFound);
        }
        response.await.unwrap_or(Err(GameError::RoomNotFound))
    }

    /// Submit an action. Returns `false` if the room is gone.
    pub async fn dispatch(&self, player_id: PlayerId, action: PlayerAction) -> bool {
        self.sender
            .send(RoomCommand::Action { player_id, action })
            .await
            .is_ok()
    }

    /// Non-blocking removal request. Hands the command back when the queue is full.
    pub fn try_leave(&self, player_id: PlayerId) -> Result<(), RoomCommand> {
        match self.sender.try_send(RoomCommand::Leave { player_id }) {
            Ok(()) | Err(TrySendError::Closed(_)) => Ok(()),
            Err(TrySendError::Full(command)) => Err(command),
        }
    }

    /// Blocking variant of [`RoomHandle::try_leave`], for detached cleanup tasks.
    pub async fn send(&self, command: RoomCommand) {
        let _ = self.sender.send(command).await;
    }

    pub async fn snapshot(&self) -> Option<RoomSnapshot> {
        let (reply, response) = oneshot::channel();
        self.sender.send(RoomCommand::Snapshot { reply }).await.ok()?;
        response.await.ok()
    }
}
