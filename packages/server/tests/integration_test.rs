//! Integration tests: an in-process server on an ephemeral port, driven over
//! real WebSocket and HTTP connections.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use lgtm_server::{
    domain::{MessagePusher, Task, TestCase},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
        task::JsonTaskProvider,
    },
    ui::Server,
    usecase::{GameConfig, Hub},
};
use lgtm_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Helper struct to manage the server task lifecycle
struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let tasks = JsonTaskProvider::from_tasks(vec![Task {
            id: 1,
            title: "Sum".to_string(),
            description: "Return a + b".to_string(),
            function_name: "sum".to_string(),
            starter_code: "function sum(a, b) {\n}".to_string(),
            test_cases: vec![TestCase {
                input: json!([1, 2]),
                expected: json!(3),
            }],
        }]);
        let config = GameConfig {
            tick_interval: Duration::from_secs(3600),
            reveal_delay: Duration::from_millis(50),
            ..GameConfig::default()
        };
        let hub = Hub::spawn(
            Arc::new(InMemoryRoomRepository::new()),
            Arc::new(tasks),
            Arc::new(SystemClock),
            Arc::new(|| Box::new(WebSocketMessagePusher::new()) as Box<dyn MessagePusher>),
            config.clone(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = Server::new(hub, config).serve(listener).await;
        });

        TestServer { addr, handle }
    }

    fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Helper struct wrapping one WebSocket client
struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl TestClient {
    async fn connect(server: &TestServer) -> Self {
        let (ws, _) = connect_async(server.ws_url()).await.unwrap();
        TestClient { ws }
    }

    async fn send(&mut self, kind: &str, data: Value) {
        let frame = json!({ "type": kind, "data": data }).to_string();
        self.ws.send(Message::text(frame)).await.unwrap();
    }

    /// Wait for the next message of the given type, skipping everything else.
    async fn recv_type(&mut self, kind: &str) -> Value {
        tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                let msg = self.ws.next().await.unwrap().unwrap();
                if let Message::Text(text) = msg {
                    let value: Value = serde_json::from_str(text.as_str()).unwrap();
                    if value["type"] == kind {
                        return value;
                    }
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for '{}'", kind))
    }

    async fn create_room(&mut self, name: &str) -> String {
        self.send("create-room", json!({ "playerName": name })).await;
        let created = self.recv_type("room-created").await;
        created["roomCode"].as_str().unwrap().to_string()
    }

    async fn join_room(&mut self, code: &str, name: &str) -> Value {
        self.send("join-room", json!({ "roomCode": code, "playerName": name }))
            .await;
        self.recv_type("room-joined").await
    }
}

/// Four connected players in one lobby. The first one created the room.
async fn full_lobby(server: &TestServer) -> (String, Vec<TestClient>) {
    let mut host = TestClient::connect(server).await;
    let code = host.create_room("Alice").await;
    let mut clients = vec![host];
    for name in ["Bob", "Carol", "Dave"] {
        let mut client = TestClient::connect(server).await;
        client.join_room(&code, name).await;
        clients.push(client);
    }
    (code, clients)
}

/// Start the game and return the index of the impostor and everyone's ids.
async fn start_game(clients: &mut [TestClient]) -> (usize, Vec<String>) {
    clients[0].send("start-game", Value::Null).await;
    let mut impostor = None;
    let mut ids = Vec::new();
    for (index, client) in clients.iter_mut().enumerate() {
        let started = client.recv_type("game-started").await;
        if started["role"] == "impostor" {
            impostor = Some(index);
        }
        if ids.is_empty() {
            ids = started["players"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["id"].as_str().unwrap().to_string())
                .collect();
        }
    }
    (impostor.unwrap(), ids)
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックが ok を返す
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let body: Value = reqwest::get(server.http_url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_join_unknown_room() {
    // テスト項目: 存在しないルームへの参加は "Room not found!" エラーになる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server).await;

    // when (操作):
    client
        .send("join-room", json!({ "roomCode": "ZZZZZZ", "playerName": "Eve" }))
        .await;

    // then (期待する結果):
    let error = client.recv_type("error").await;
    assert_eq!(error["message"], "Room not found!");
}

#[tokio::test]
async fn test_room_code_is_case_insensitive() {
    // テスト項目: ルームコードは小文字・前後の空白付きでも参加できる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut host = TestClient::connect(&server).await;
    let code = host.create_room("Alice").await;
    let mut guest = TestClient::connect(&server).await;

    // when (操作):
    let joined = guest
        .join_room(&format!("  {} ", code.to_lowercase()), "Bob")
        .await;

    // then (期待する結果):
    assert_eq!(joined["roomCode"], code.as_str());
    let list = host.recv_type("player-list").await;
    assert_eq!(list["players"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_fifth_player_is_rejected() {
    // テスト項目: 5 人目の参加は "Room is full!" エラーになる
    // given (前提条件):
    let server = TestServer::start().await;
    let (code, _clients) = full_lobby(&server).await;
    let mut fifth = TestClient::connect(&server).await;

    // when (操作):
    fifth
        .send("join-room", json!({ "roomCode": code, "playerName": "Eve" }))
        .await;

    // then (期待する結果):
    let error = fifth.recv_type("error").await;
    assert_eq!(error["message"], "Room is full!");
}

#[tokio::test]
async fn test_start_requires_four_players() {
    // テスト項目: 4 人未満でのゲーム開始は "Need 4 players to start!" エラーになる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut host = TestClient::connect(&server).await;
    host.create_room("Alice").await;

    // when (操作):
    host.send("start-game", json!({})).await;

    // then (期待する結果):
    let error = host.recv_type("error").await;
    assert_eq!(error["message"], "Need 4 players to start!");
}

#[tokio::test]
async fn test_ejecting_the_impostor_wins_for_engineers() {
    // テスト項目: 会議で全員がインポスターに投票するとエンジニアが勝利する
    // given (前提条件):
    let server = TestServer::start().await;
    let (code, mut clients) = full_lobby(&server).await;
    let (impostor, ids) = start_game(&mut clients).await;
    let target = ids[impostor].clone();

    // when (操作):
    clients[1].send("call-meeting", Value::Null).await;
    for client in clients.iter_mut() {
        client.recv_type("meeting-called").await;
    }
    for client in clients.iter_mut() {
        client.send("cast-vote", json!({ "targetId": target })).await;
    }

    // then (期待する結果):
    let ended = clients[0].recv_type("voting-ended").await;
    assert_eq!(ended["ejectedPlayer"]["id"], target.as_str());
    assert_eq!(ended["wasImpostor"], true);
    let over = clients[0].recv_type("game-ended").await;
    assert_eq!(over["winner"], "engineers");
    assert_eq!(over["impostor"]["id"], target.as_str());

    let detail: Value = reqwest::get(server.http_url(&format!("/api/rooms/{}", code)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["phase"], "ended");
}

#[tokio::test]
async fn test_skip_votes_resume_the_game() {
    // テスト項目: 全員スキップすると誰も追放されずゲームが再開する
    // given (前提条件):
    let server = TestServer::start().await;
    let (_code, mut clients) = full_lobby(&server).await;
    start_game(&mut clients).await;
    clients[2]
        .send("code-update", json!({ "code": "function sum(a, b) { return a + b }" }))
        .await;
    let update = clients[0].recv_type("code-updated").await;
    assert_eq!(update["lastEditor"], "Carol");

    // when (操作):
    clients[0].send("call-meeting", json!({})).await;
    let meeting = clients[0].recv_type("meeting-called").await;
    for client in clients.iter_mut() {
        client.send("cast-vote", json!({ "targetId": "skip" })).await;
    }

    // then (期待する結果):
    assert_eq!(meeting["editHistory"].as_array().unwrap().len(), 1);
    let ended = clients[3].recv_type("voting-ended").await;
    assert!(ended["ejectedPlayer"].is_null());
    let resumed = clients[3].recv_type("game-resumed").await;
    assert_eq!(resumed["timeRemaining"], 180);
}

#[tokio::test]
async fn test_room_is_destroyed_when_everyone_leaves() {
    // テスト項目: 全員が切断するとルームが破棄され、詳細 API は 404 を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let mut host = TestClient::connect(&server).await;
    let code = host.create_room("Alice").await;
    let url = server.http_url(&format!("/api/rooms/{}", code));
    assert_eq!(reqwest::get(&url).await.unwrap().status(), 200);

    // when (操作):
    host.ws.close(None).await.unwrap();

    // then (期待する結果):
    tokio::time::timeout(RECV_TIMEOUT, async {
        while reqwest::get(&url).await.unwrap().status() != 404 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    let rooms: Value = reqwest::get(server.http_url("/api/rooms"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms, json!([]));
}
