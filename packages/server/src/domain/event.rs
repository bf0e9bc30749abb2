//! Outbound domain events. Encoding into wire frames lives in the infrastructure layer.

use super::{
    entity::{EditRecord, Player, Role, Task},
    value_object::{RoomCode, Timestamp},
};
use super::game::{GameOutcome, TallyResult, VoteProgress};

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// To the creator only.
    RoomCreated {
        room_code: RoomCode,
        player: Player,
        players: Vec<Player>,
    },
    /// To the joiner only.
    RoomJoined {
        room_code: RoomCode,
        player: Player,
        players: Vec<Player>,
    },
    PlayerList {
        players: Vec<Player>,
    },
    /// Sent per recipient, each carrying only that recipient's role.
    GameStarted {
        role: Role,
        task: Task,
        time_limit: u32,
        players: Vec<Player>,
    },
    CodeUpdated {
        code: String,
        editor: Player,
    },
    MeetingCalled {
        caller: String,
        edit_history: Vec<EditRecord>,
        players: Vec<Player>,
    },
    TimeUpdate {
        time_remaining: u32,
    },
    VotingTimeUpdate {
        time_remaining: u32,
    },
    VoteCast {
        progress: VoteProgress,
    },
    VotingEnded {
        result: TallyResult,
    },
    GameResumed {
        players: Vec<Player>,
        time_remaining: u32,
    },
    GameEnded {
        outcome: GameOutcome,
    },
    ChatMessage {
        player: Player,
        message: String,
        timestamp: Timestamp,
    },
    /// To the submitter only.
    TaskFailed {
        message: String,
    },
    /// To the initiator only.
    Error {
        message: String,
    },
}

impl GameEvent {
    pub fn error(message: impl ToString) -> Self {
        GameEvent::Error {
            message: message.to_string(),
        }
    }

    /// Wire discriminator, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::RoomCreated { .. } => "room-created",
            GameEvent::RoomJoined { .. } => "room-joined",
            GameEvent::PlayerList { .. } => "player-list",
            GameEvent::GameStarted { .. } => "game-started",
            GameEvent::CodeUpdated { .. } => "code-updated",
            GameEvent::MeetingCalled { .. } => "meeting-called",
            GameEvent::TimeUpdate { .. } => "time-update",
            GameEvent::VotingTimeUpdate { .. } => "voting-time-update",
            GameEvent::VoteCast { .. } => "vote-cast",
            GameEvent::VotingEnded { .. } => "voting-ended",
            GameEvent::GameResumed { .. } => "game-resumed",
            GameEvent::GameEnded { .. } => "game-ended",
            GameEvent::ChatMessage { .. } => "chat-message",
            GameEvent::TaskFailed { .. } => "task-failed",
            GameEvent::Error { .. } => "error",
        }
    }
}
