//! Value objects: identifiers and timestamps that are validated on creation.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::ValueObjectError;

/// Length of a shareable room code.
pub const ROOM_CODE_LENGTH: usize = 6;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Process-unique identity of a connection, and of the player it projects into a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyPlayerId);
        }
        Ok(Self(value))
    }

    /// Mint a fresh random id for a newly accepted connection.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for PlayerId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Six upper-case alphanumeric characters identifying a live room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomCode(String);

impl RoomCode {
    /// Parse a user-typed code. Surrounding whitespace is ignored and letters are upper-cased.
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let normalized = value.trim().to_ascii_uppercase();
        let valid = normalized.len() == ROOM_CODE_LENGTH
            && normalized.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b));
        if !valid {
            return Err(ValueObjectError::InvalidRoomCode(value));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates random room codes.
pub struct RoomCodeFactory;

impl RoomCodeFactory {
    pub fn generate<R: Rng>(rng: &mut R) -> RoomCode {
        let code: String = (0..ROOM_CODE_LENGTH)
            .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        RoomCode(code)
    }
}

/// Unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_player_id_rejects_blank() {
        // テスト項目: 空白のみの PlayerId は作成できない
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = PlayerId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyPlayerId));
    }

    #[test]
    fn test_player_id_generate_is_unique() {
        // テスト項目: 生成される PlayerId は毎回異なる
        // given (前提条件):

        // when (操作):
        let a = PlayerId::generate();
        let b = PlayerId::generate();

        // then (期待する結果):
        assert_ne!(a, b);
    }

    #[test]
    fn test_room_code_normalizes_input() {
        // テスト項目: 小文字と前後の空白を含むコードが正規化される
        // given (前提条件):
        let value = " ab12cd ".to_string();

        // when (操作):
        let code = RoomCode::new(value).unwrap();

        // then (期待する結果):
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn test_room_code_rejects_wrong_length_and_symbols() {
        // テスト項目: 長さ違い・記号入りのコードは拒否される
        // given (前提条件):
        let too_short = "ABC".to_string();
        let symbol = "ABC-12".to_string();

        // when (操作):
        let short_result = RoomCode::new(too_short);
        let symbol_result = RoomCode::new(symbol);

        // then (期待する結果):
        assert!(matches!(short_result, Err(ValueObjectError::InvalidRoomCode(_))));
        assert!(matches!(symbol_result, Err(ValueObjectError::InvalidRoomCode(_))));
    }

    #[test]
    fn test_room_code_factory_generates_valid_codes() {
        // テスト項目: 生成されたコードは常にパース可能な形式である
        // given (前提条件):
        let mut rng = StdRng::seed_from_u64(7);

        // when (操作):
        let codes: Vec<RoomCode> = (0..100).map(|_| RoomCodeFactory::generate(&mut rng)).collect();

        // then (期待する結果):
        for code in codes {
            assert_eq!(RoomCode::new(code.as_str().to_string()), Ok(code));
        }
    }
}
