//! Domain entities owned by a room.

use super::value_object::{PlayerId, Timestamp};

/// Palette handed out to players in join order.
pub const PLAYER_COLORS: [&str; 4] = ["#00ff88", "#ff6b6b", "#4ecdc4", "#ffe66d"];

/// Secret role dealt at game start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Not dealt yet (lobby).
    #[default]
    Unassigned,
    Engineer,
    Impostor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unassigned => "",
            Role::Engineer => "engineer",
            Role::Impostor => "impostor",
        }
    }
}

/// Per-room projection of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub is_alive: bool,
    pub color: &'static str,
}

impl Player {
    pub fn new(id: PlayerId, name: String, color: &'static str) -> Self {
        Self {
            id,
            name,
            role: Role::Unassigned,
            is_alive: true,
            color,
        }
    }

    pub fn is_impostor(&self) -> bool {
        self.role == Role::Impostor
    }
}

/// One entry of the shared buffer's edit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRecord {
    pub player_id: PlayerId,
    pub player_name: String,
    pub timestamp: Timestamp,
    /// Signed change in character count caused by the edit.
    pub char_diff: i64,
}

/// Input/expected pair checked by the client-side grader.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub input: serde_json::Value,
    pub expected: serde_json::Value,
}

/// Immutable puzzle definition picked at game start.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub function_name: String,
    pub starter_code: String,
    pub test_cases: Vec<TestCase>,
}

/// Side that won a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Engineers,
    Impostor,
}

impl Winner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Engineers => "engineers",
            Winner::Impostor => "impostor",
        }
    }
}
