//! Domain layer: entities, the game state machine and the seams the other layers implement.

pub mod action;
pub mod entity;
pub mod error;
pub mod event;
pub mod game;
pub mod message_pusher;
pub mod repository;
pub mod room;
pub mod tally;
pub mod task_provider;
pub mod value_object;

pub use action::{ClientRequest, PlayerAction, VoteTarget};
pub use entity::{EditRecord, PLAYER_COLORS, Player, Role, Task, TestCase, Winner};
pub use error::{
    CreateRoomError, GameError, MessagePushError, RepositoryError, ValueObjectError,
};
pub use event::GameEvent;
pub use game::{
    ClockTick, EDIT_HISTORY_LIMIT, GameOutcome, GamePhase, GameRules, GameSession, MAX_PLAYERS,
    Resolution, Submission, TallyResult, VoteProgress,
};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::RoomRepository;
pub use room::{ClockKind, RoomCommand, RoomHandle, RoomSnapshot};
pub use task_provider::TaskProvider;
pub use value_object::{PlayerId, RoomCode, RoomCodeFactory, Timestamp};
