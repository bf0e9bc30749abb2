//! Domain error types.

use thiserror::Error;

/// Raised when a value object is constructed from invalid input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("player id must not be empty")]
    EmptyPlayerId,
    #[error("invalid room code: '{0}'")]
    InvalidRoomCode(String),
}

/// Validation errors surfaced to the initiating connection as an `error` event.
///
/// The `Display` text is the human-readable message sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Room not found!")]
    RoomNotFound,
    #[error("Room is full!")]
    RoomFull,
    #[error("Game already in progress!")]
    GameInProgress,
    #[error("Need 4 players to start!")]
    NotEnoughPlayers,
    #[error("No tasks available!")]
    NoTasksAvailable,
}

/// Raised when a message cannot be handed to a connection's outbound queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("client '{0}' not found")]
    ClientNotFound(String),
    #[error("outbound queue of '{0}' is full")]
    QueueFull(String),
    #[error("outbound queue of '{0}' is closed")]
    QueueClosed(String),
    #[error("failed to encode message: {0}")]
    Encode(String),
}

/// Raised by room directory implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("room code '{0}' is already in use")]
    DuplicateRoomCode(String),
}

/// Raised when a room cannot be opened for its creator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateRoomError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    CreatorRejected(#[from] GameError),
}
