//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。ルームの状態そのものは各ルームの
//! セッションタスクが所有し、ここにはそのハンドルだけを保持します。

use std::collections::{HashMap, hash_map::Entry};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, RoomCode, RoomHandle, RoomRepository};

/// インメモリ Room Repository 実装
#[derive(Default)]
pub struct InMemoryRoomRepository {
    /// Key: room code, Value: the room's command handle
    rooms: Mutex<HashMap<RoomCode, RoomHandle>>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn insert(&self, room: RoomHandle) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        match rooms.entry(room.code().clone()) {
            Entry::Occupied(entry) => Err(RepositoryError::DuplicateRoomCode(
                entry.key().as_str().to_string(),
            )),
            Entry::Vacant(entry) => {
                entry.insert(room);
                Ok(())
            }
        }
    }

    async fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        let rooms = self.rooms.lock().await;
        rooms.get(code).cloned()
    }

    async fn remove(&self, code: &RoomCode) -> Option<RoomHandle> {
        let mut rooms = self.rooms.lock().await;
        rooms.remove(code)
    }

    async fn list(&self) -> Vec<RoomHandle> {
        let rooms = self.rooms.lock().await;
        let mut handles: Vec<RoomHandle> = rooms.values().cloned().collect();
        handles.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.code().as_str().cmp(b.code().as_str()))
        });
        handles
    }

    async fn count(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::{RoomCommand, Timestamp};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ルームコード → ルームハンドルの登録・取得・削除
    // - 重複コードの登録拒否（ルーム作成時の再試行の前提）
    // ========================================

    fn handle(code: &str, created_at: i64) -> (RoomHandle, mpsc::Receiver<RoomCommand>) {
        let (tx, rx) = mpsc::channel(1);
        let code = RoomCode::new(code.to_string()).unwrap();
        (RoomHandle::new(code, Timestamp::new(created_at), tx), rx)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        // テスト項目: 登録したルームをコードで取得できる
        // given (前提条件):
        let repository = InMemoryRoomRepository::new();
        let (room, _rx) = handle("ABC123", 1000);

        // when (操作):
        let result = repository.insert(room).await;

        // then (期待する結果):
        assert!(result.is_ok());
        let code = RoomCode::new("ABC123".to_string()).unwrap();
        let found = repository.get(&code).await.unwrap();
        assert_eq!(found.created_at(), Timestamp::new(1000));
        assert_eq!(repository.count().await, 1);
    }

    #[tokio::test]
    async fn test_insert_duplicate_code_fails() {
        // テスト項目: 使用中のコードでの登録は失敗し、既存のルームは置き換わらない
        // given (前提条件):
        let repository = InMemoryRoomRepository::new();
        let (first, _rx1) = handle("ABC123", 1000);
        let (second, _rx2) = handle("ABC123", 2000);
        repository.insert(first).await.unwrap();

        // when (操作):
        let result = repository.insert(second).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::DuplicateRoomCode("ABC123".to_string()))
        );
        let code = RoomCode::new("ABC123".to_string()).unwrap();
        assert_eq!(
            repository.get(&code).await.unwrap().created_at(),
            Timestamp::new(1000)
        );
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        // テスト項目: 削除は一度目だけハンドルを返し、存在しないコードの削除は何もしない
        // given (前提条件):
        let repository = InMemoryRoomRepository::new();
        let (room, _rx) = handle("ZZZ999", 1000);
        repository.insert(room).await.unwrap();
        let code = RoomCode::new("ZZZ999".to_string()).unwrap();

        // when (操作):
        let first = repository.remove(&code).await;
        let second = repository.remove(&code).await;

        // then (期待する結果):
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(repository.count().await, 0);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_creation() {
        // テスト項目: 一覧は作成時刻順に並ぶ
        // given (前提条件):
        let repository = InMemoryRoomRepository::new();
        let (late, _rx1) = handle("BBBBBB", 2000);
        let (early, _rx2) = handle("AAAAAA", 1000);
        repository.insert(late).await.unwrap();
        repository.insert(early).await.unwrap();

        // when (操作):
        let rooms = repository.list().await;

        // then (期待する結果):
        let codes: Vec<&str> = rooms.iter().map(|r| r.code().as_str()).collect();
        assert_eq!(codes, vec!["AAAAAA", "BBBBBB"]);
    }
}
