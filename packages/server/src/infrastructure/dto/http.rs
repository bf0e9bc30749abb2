//! HTTP API DTOs, plus the on-disk task format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::websocket::PublicPlayerDto;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub code: String,
    pub phase: String,
    pub players: Vec<PublicPlayerDto>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub code: String,
    pub phase: String,
    pub players: Vec<PublicPlayerDto>,
    pub time_remaining: u32,
    pub voting_time_remaining: u32,
    pub edit_count: usize,
    pub created_at: String,
}

/// A coding puzzle, as stored in the task file and sent in `game-started`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub function_name: String,
    pub starter_code: String,
    #[serde(default)]
    pub test_cases: Vec<TestCaseDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseDto {
    pub input: Value,
    pub expected: Value,
}
