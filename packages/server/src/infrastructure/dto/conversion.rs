//! Conversion logic between DTOs and domain types.

use lgtm_shared::time::timestamp_to_rfc3339;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{
    ClientRequest, EditRecord, GameEvent, Player, PlayerAction, RoomSnapshot, Task, TestCase,
    VoteTarget,
};
use crate::infrastructure::dto::{
    http::{RoomDetailDto, RoomSummaryDto, TaskDto, TestCaseDto},
    websocket::{
        CastVotePayload, ChatMessagePayload, ClientEnvelope, CodeUpdatePayload, CreateRoomPayload,
        EditRecordDto, JoinRoomPayload, PlayerDto, PlayerRefDto, PublicPlayerDto, ServerMessage,
        SubmitTaskPayload, VotesCountDto,
    },
};

// ========================================
// DTO → Domain
// ========================================

/// Decode a payload. A missing or `null` payload is the payload's zero value.
fn payload<T: DeserializeOwned + Default>(data: Value) -> Result<T, serde_json::Error> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data)
}

impl ClientEnvelope {
    /// Map the envelope onto a request. Unknown kinds and blank vote targets yield `None`.
    pub fn into_request(self) -> Result<Option<ClientRequest>, serde_json::Error> {
        let request = match self.kind.as_str() {
            "create-room" => {
                let p: CreateRoomPayload = payload(self.data)?;
                ClientRequest::CreateRoom {
                    player_name: p.player_name,
                }
            }
            "join-room" => {
                let p: JoinRoomPayload = payload(self.data)?;
                ClientRequest::JoinRoom {
                    room_code: p.room_code,
                    player_name: p.player_name,
                }
            }
            "start-game" => ClientRequest::Room(PlayerAction::StartGame),
            "code-update" => {
                let p: CodeUpdatePayload = payload(self.data)?;
                ClientRequest::Room(PlayerAction::CodeUpdate { code: p.code })
            }
            "call-meeting" => ClientRequest::Room(PlayerAction::CallMeeting),
            "cast-vote" => {
                let p: CastVotePayload = payload(self.data)?;
                let Some(target) = VoteTarget::parse(p.target_id) else {
                    return Ok(None);
                };
                ClientRequest::Room(PlayerAction::CastVote { target })
            }
            "chat-message" => {
                let p: ChatMessagePayload = payload(self.data)?;
                ClientRequest::Room(PlayerAction::ChatMessage { message: p.message })
            }
            "submit-task" => {
                let p: SubmitTaskPayload = payload(self.data)?;
                ClientRequest::Room(PlayerAction::SubmitTask { passed: p.passed })
            }
            _ => return Ok(None),
        };
        Ok(Some(request))
    }
}

impl From<TestCaseDto> for TestCase {
    fn from(dto: TestCaseDto) -> Self {
        Self {
            input: dto.input,
            expected: dto.expected,
        }
    }
}

impl From<TaskDto> for Task {
    fn from(dto: TaskDto) -> Self {
        Self {
            id: dto.id,
            title: dto.title,
            description: dto.description,
            function_name: dto.function_name,
            starter_code: dto.starter_code,
            test_cases: dto.test_cases.into_iter().map(TestCase::from).collect(),
        }
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<&Player> for PublicPlayerDto {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.as_str().to_string(),
            name: player.name.clone(),
            is_alive: player.is_alive,
            color: player.color.to_string(),
        }
    }
}

impl From<&Player> for PlayerDto {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.as_str().to_string(),
            name: player.name.clone(),
            role: player.role.as_str().to_string(),
            is_alive: player.is_alive,
            color: player.color.to_string(),
        }
    }
}

impl From<&Player> for PlayerRefDto {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.as_str().to_string(),
            name: player.name.clone(),
        }
    }
}

impl From<&TestCase> for TestCaseDto {
    fn from(case: &TestCase) -> Self {
        Self {
            input: case.input.clone(),
            expected: case.expected.clone(),
        }
    }
}

impl From<&Task> for TaskDto {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            function_name: task.function_name.clone(),
            starter_code: task.starter_code.clone(),
            test_cases: task.test_cases.iter().map(TestCaseDto::from).collect(),
        }
    }
}

impl From<&EditRecord> for EditRecordDto {
    fn from(record: &EditRecord) -> Self {
        Self {
            player_id: record.player_id.as_str().to_string(),
            player_name: record.player_name.clone(),
            timestamp: record.timestamp.value(),
            char_diff: record.char_diff,
        }
    }
}

fn public_roster(players: &[Player]) -> Vec<PublicPlayerDto> {
    players.iter().map(PublicPlayerDto::from).collect()
}

impl From<&GameEvent> for ServerMessage {
    fn from(event: &GameEvent) -> Self {
        match event {
            GameEvent::RoomCreated {
                room_code,
                player,
                players,
            } => ServerMessage::RoomCreated {
                room_code: room_code.as_str().to_string(),
                player: player.into(),
                players: public_roster(players),
            },
            GameEvent::RoomJoined {
                room_code,
                player,
                players,
            } => ServerMessage::RoomJoined {
                room_code: room_code.as_str().to_string(),
                player: player.into(),
                players: public_roster(players),
            },
            GameEvent::PlayerList { players } => ServerMessage::PlayerList {
                players: public_roster(players),
            },
            GameEvent::GameStarted {
                role,
                task,
                time_limit,
                players,
            } => ServerMessage::GameStarted {
                role: role.as_str().to_string(),
                task: task.into(),
                time_limit: *time_limit,
                players: public_roster(players),
            },
            GameEvent::CodeUpdated { code, editor } => ServerMessage::CodeUpdated {
                code: code.clone(),
                last_editor: editor.name.clone(),
                last_editor_id: editor.id.as_str().to_string(),
            },
            GameEvent::MeetingCalled {
                caller,
                edit_history,
                players,
            } => ServerMessage::MeetingCalled {
                caller: caller.clone(),
                edit_history: edit_history.iter().map(EditRecordDto::from).collect(),
                players: public_roster(players),
            },
            GameEvent::TimeUpdate { time_remaining } => ServerMessage::TimeUpdate {
                time_remaining: *time_remaining,
            },
            GameEvent::VotingTimeUpdate { time_remaining } => ServerMessage::VotingTimeUpdate {
                time_remaining: *time_remaining,
            },
            GameEvent::VoteCast { progress } => ServerMessage::VoteCast {
                votes_count: VotesCountDto {
                    voted: progress.voted,
                    total: progress.total,
                },
            },
            GameEvent::VotingEnded { result } => ServerMessage::VotingEnded {
                ejected_player: result.ejected.as_ref().map(PlayerRefDto::from),
                was_impostor: result.was_impostor,
                votes: result
                    .votes
                    .iter()
                    .map(|(voter, target)| {
                        (voter.as_str().to_string(), target.as_str().to_string())
                    })
                    .collect(),
            },
            GameEvent::GameResumed {
                players,
                time_remaining,
            } => ServerMessage::GameResumed {
                players: public_roster(players),
                time_remaining: *time_remaining,
            },
            GameEvent::GameEnded { outcome } => ServerMessage::GameEnded {
                winner: outcome.winner.as_str().to_string(),
                reason: outcome.reason.clone(),
                impostor: outcome.impostor.as_ref().map(PlayerRefDto::from),
                players: outcome.players.iter().map(PlayerDto::from).collect(),
            },
            GameEvent::ChatMessage {
                player,
                message,
                timestamp,
            } => ServerMessage::ChatMessage {
                player_id: player.id.as_str().to_string(),
                player_name: player.name.clone(),
                player_color: player.color.to_string(),
                message: message.clone(),
                timestamp: timestamp.value(),
            },
            GameEvent::TaskFailed { message } => ServerMessage::TaskFailed {
                message: message.clone(),
            },
            GameEvent::Error { message } => ServerMessage::Error {
                message: message.clone(),
            },
        }
    }
}

impl From<&RoomSnapshot> for RoomSummaryDto {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            code: snapshot.code.as_str().to_string(),
            phase: snapshot.phase.as_str().to_string(),
            players: public_roster(&snapshot.players),
            created_at: timestamp_to_rfc3339(snapshot.created_at.value()),
        }
    }
}

impl From<&RoomSnapshot> for RoomDetailDto {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            code: snapshot.code.as_str().to_string(),
            phase: snapshot.phase.as_str().to_string(),
            players: public_roster(&snapshot.players),
            time_remaining: snapshot.time_remaining,
            voting_time_remaining: snapshot.voting_time_remaining,
            edit_count: snapshot.edit_count,
            created_at: timestamp_to_rfc3339(snapshot.created_at.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        GameOutcome, GamePhase, PlayerId, Role, RoomCode, TallyResult, Timestamp, Winner,
    };

    fn envelope(json: &str) -> ClientEnvelope {
        serde_json::from_str(json).unwrap()
    }

    fn player(id: &str, name: &str, role: Role) -> Player {
        let mut player = Player::new(PlayerId::new(id.to_string()).unwrap(), name.to_string(), "#00ff88");
        player.role = role;
        player
    }

    #[test]
    fn test_join_room_envelope_to_request() {
        // テスト項目: join-room の封筒がリクエストに変換される
        // given (前提条件):
        let raw = envelope(r#"{"type":"join-room","data":{"roomCode":"abc123","playerName":"Bob"}}"#);

        // when (操作):
        let request = raw.into_request().unwrap();

        // then (期待する結果):
        assert_eq!(
            request,
            Some(ClientRequest::JoinRoom {
                room_code: "abc123".to_string(),
                player_name: "Bob".to_string(),
            })
        );
    }

    #[test]
    fn test_payloadless_kinds_accept_missing_null_and_empty_data() {
        // テスト項目: ペイロードなしの種別は data が無い・null・{} のいずれでも受理される
        // given (前提条件):
        let frames = [
            r#"{"type":"start-game"}"#,
            r#"{"type":"start-game","data":null}"#,
            r#"{"type":"start-game","data":{}}"#,
        ];

        for frame in frames {
            // when (操作):
            let request = envelope(frame).into_request().unwrap();

            // then (期待する結果):
            assert_eq!(request, Some(ClientRequest::Room(PlayerAction::StartGame)));
        }
    }

    #[test]
    fn test_missing_fields_take_zero_values() {
        // テスト項目: 欠けたフィールドはゼロ値になる
        // given (前提条件):
        let raw = envelope(r#"{"type":"submit-task","data":{}}"#);

        // when (操作):
        let request = raw.into_request().unwrap();

        // then (期待する結果):
        assert_eq!(
            request,
            Some(ClientRequest::Room(PlayerAction::SubmitTask { passed: false }))
        );
    }

    #[test]
    fn test_cast_vote_targets() {
        // テスト項目: "skip" は棄権票、空の targetId は無視される
        // given (前提条件):
        let skip = envelope(r#"{"type":"cast-vote","data":{"targetId":"skip"}}"#);
        let blank = envelope(r#"{"type":"cast-vote","data":{"targetId":""}}"#);
        let player = envelope(r#"{"type":"cast-vote","data":{"targetId":"p-1"}}"#);

        // when (操作):
        let skip = skip.into_request().unwrap();
        let blank = blank.into_request().unwrap();
        let player = player.into_request().unwrap();

        // then (期待する結果):
        assert_eq!(
            skip,
            Some(ClientRequest::Room(PlayerAction::CastVote {
                target: VoteTarget::Skip
            }))
        );
        assert_eq!(blank, None);
        assert_eq!(
            player,
            Some(ClientRequest::Room(PlayerAction::CastVote {
                target: VoteTarget::Player(PlayerId::new("p-1".to_string()).unwrap())
            }))
        );
    }

    #[test]
    fn test_unknown_kind_is_ignored_and_bad_payload_is_an_error() {
        // テスト項目: 未知の種別は None、型の合わないペイロードはエラーになる
        // given (前提条件):
        let unknown = envelope(r#"{"type":"dance","data":{}}"#);
        let bad = envelope(r#"{"type":"code-update","data":{"code":42}}"#);

        // when (操作):
        let unknown = unknown.into_request();
        let bad = bad.into_request();

        // then (期待する結果):
        assert!(matches!(unknown, Ok(None)));
        assert!(bad.is_err());
    }

    #[test]
    fn test_game_started_hides_roster_roles() {
        // テスト項目: game-started は受信者の役割だけを含み、名簿には役割を含まない
        // given (前提条件):
        let task = Task {
            id: 3,
            title: "Reverse".to_string(),
            description: "Reverse a string".to_string(),
            function_name: "reverse".to_string(),
            starter_code: String::new(),
            test_cases: vec![],
        };
        let event = GameEvent::GameStarted {
            role: Role::Impostor,
            task,
            time_limit: 180,
            players: vec![player("p-1", "Alice", Role::Impostor)],
        };

        // when (操作):
        let json = serde_json::to_value(ServerMessage::from(&event)).unwrap();

        // then (期待する結果):
        assert_eq!(json["type"], "game-started");
        assert_eq!(json["role"], "impostor");
        assert_eq!(json["timeLimit"], 180);
        assert_eq!(json["task"]["functionName"], "reverse");
        assert_eq!(json["task"]["testCases"], serde_json::json!([]));
        assert_eq!(
            json["players"][0],
            serde_json::json!({"id": "p-1", "name": "Alice", "isAlive": true, "color": "#00ff88"})
        );
    }

    #[test]
    fn test_voting_ended_without_ejection() {
        // テスト項目: 追放なしの voting-ended は ejectedPlayer が null で、票は投票者 ID で引ける
        // given (前提条件):
        let voter = PlayerId::new("p-1".to_string()).unwrap();
        let event = GameEvent::VotingEnded {
            result: TallyResult {
                ejected: None,
                was_impostor: false,
                votes: vec![(voter, VoteTarget::Skip)],
            },
        };

        // when (操作):
        let json = serde_json::to_value(ServerMessage::from(&event)).unwrap();

        // then (期待する結果):
        assert_eq!(json["type"], "voting-ended");
        assert!(json["ejectedPlayer"].is_null());
        assert_eq!(json["wasImpostor"], false);
        assert_eq!(json["votes"], serde_json::json!({"p-1": "skip"}));
    }

    #[test]
    fn test_game_ended_reveals_roles() {
        // テスト項目: game-ended は全員の役割とインポスターを公開する
        // given (前提条件):
        let impostor = player("p-2", "Bob", Role::Impostor);
        let event = GameEvent::GameEnded {
            outcome: GameOutcome {
                winner: Winner::Engineers,
                reason: "Impostor was ejected!".to_string(),
                impostor: Some(impostor.clone()),
                players: vec![player("p-1", "Alice", Role::Engineer), impostor],
            },
        };

        // when (操作):
        let json = serde_json::to_value(ServerMessage::from(&event)).unwrap();

        // then (期待する結果):
        assert_eq!(json["winner"], "engineers");
        assert_eq!(json["impostor"], serde_json::json!({"id": "p-2", "name": "Bob"}));
        assert_eq!(json["players"][0]["role"], "engineer");
        assert_eq!(json["players"][1]["role"], "impostor");
    }

    #[test]
    fn test_snapshot_to_room_detail() {
        // テスト項目: ルームのスナップショットが詳細 DTO に変換される
        // given (前提条件):
        let snapshot = RoomSnapshot {
            code: RoomCode::new("ABC123".to_string()).unwrap(),
            phase: GamePhase::Voting,
            players: vec![player("p-1", "Alice", Role::Engineer)],
            time_remaining: 120,
            voting_time_remaining: 45,
            edit_count: 7,
            created_at: Timestamp::new(0),
        };

        // when (操作):
        let detail = RoomDetailDto::from(&snapshot);
        let summary = RoomSummaryDto::from(&snapshot);

        // then (期待する結果):
        assert_eq!(detail.code, "ABC123");
        assert_eq!(detail.phase, "voting");
        assert_eq!(detail.voting_time_remaining, 45);
        assert_eq!(detail.edit_count, 7);
        assert_eq!(detail.created_at, "1970-01-01T00:00:00+00:00");
        assert_eq!(summary.players.len(), 1);
    }
}
