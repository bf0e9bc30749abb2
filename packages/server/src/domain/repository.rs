//! RoomRepository trait: the room code → room directory.

use async_trait::async_trait;

use super::{RepositoryError, room::RoomHandle, value_object::RoomCode};

/// Directory of live rooms.
///
/// Implementations serialize every read and write of the mapping.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Register a room. Fails if the code is already taken.
    async fn insert(&self, room: RoomHandle) -> Result<(), RepositoryError>;

    async fn get(&self, code: &RoomCode) -> Option<RoomHandle>;

    /// Remove a room. Absent codes are a no-op.
    async fn remove(&self, code: &RoomCode) -> Option<RoomHandle>;

    async fn list(&self) -> Vec<RoomHandle>;

    async fn count(&self) -> usize;
}
