//! WebSocket message DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::http::TaskDto;

/// Inbound frame: `{"type": <kind>, "data": {...}}`.
///
/// `data` is kept raw and decoded per kind, since it may be absent, `null`
/// or `{}` for payload-less kinds.
#[derive(Debug, Deserialize)]
pub struct ClientEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateRoomPayload {
    pub player_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinRoomPayload {
    pub room_code: String,
    pub player_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CodeUpdatePayload {
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CastVotePayload {
    pub target_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatMessagePayload {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitTaskPayload {
    pub passed: bool,
}

/// Roster entry as other players see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayerDto {
    pub id: String,
    pub name: String,
    pub is_alive: bool,
    pub color: String,
}

/// Roster entry including the role. Only sent to its owner, or once the game is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: String,
    pub name: String,
    pub role: String,
    pub is_alive: bool,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRefDto {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecordDto {
    pub player_id: String,
    pub player_name: String,
    pub timestamp: i64,
    pub char_diff: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesCountDto {
    pub voted: usize,
    pub total: usize,
}

/// Outbound frame, flattened under a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    RoomCreated {
        room_code: String,
        player: PlayerDto,
        players: Vec<PublicPlayerDto>,
    },
    RoomJoined {
        room_code: String,
        player: PlayerDto,
        players: Vec<PublicPlayerDto>,
    },
    PlayerList {
        players: Vec<PublicPlayerDto>,
    },
    GameStarted {
        role: String,
        task: TaskDto,
        time_limit: u32,
        players: Vec<PublicPlayerDto>,
    },
    CodeUpdated {
        code: String,
        last_editor: String,
        last_editor_id: String,
    },
    MeetingCalled {
        caller: String,
        edit_history: Vec<EditRecordDto>,
        players: Vec<PublicPlayerDto>,
    },
    TimeUpdate {
        time_remaining: u32,
    },
    VotingTimeUpdate {
        time_remaining: u32,
    },
    VoteCast {
        votes_count: VotesCountDto,
    },
    VotingEnded {
        ejected_player: Option<PlayerRefDto>,
        was_impostor: bool,
        /// voter id → target id or `"skip"`
        votes: BTreeMap<String, String>,
    },
    GameResumed {
        players: Vec<PublicPlayerDto>,
        time_remaining: u32,
    },
    GameEnded {
        winner: String,
        reason: String,
        impostor: Option<PlayerRefDto>,
        players: Vec<PlayerDto>,
    },
    ChatMessage {
        player_id: String,
        player_name: String,
        player_color: String,
        message: String,
        timestamp: i64,
    },
    TaskFailed {
        message: String,
    },
    Error {
        message: String,
    },
}
