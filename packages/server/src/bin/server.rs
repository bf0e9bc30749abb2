//! LGTM game server.
//!
//! Hosts rooms of the social-deduction coding game over WebSocket.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin lgtm-server
//! cargo run --bin lgtm-server -- --host 0.0.0.0 --port 3001 --tasks tasks.json
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use lgtm_server::{
    domain::{GameRules, MessagePusher, TaskProvider},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
        task::JsonTaskProvider,
    },
    ui::Server,
    usecase::{GameConfig, Hub, PusherFactory},
};
use lgtm_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "lgtm-server")]
#[command(about = "Session server for the LGTM multiplayer coding game", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "3001")]
    port: u16,

    /// JSON file with the task pool
    #[arg(long, default_value = "tasks.json")]
    tasks: PathBuf,

    /// Length of the game clock, in seconds
    #[arg(long, default_value_t = 180)]
    game_seconds: u32,

    /// Length of the voting clock, in seconds
    #[arg(long, default_value_t = 60)]
    voting_seconds: u32,

    /// Pause between the vote result and the win-condition check, in milliseconds
    #[arg(long, default_value_t = 3000)]
    reveal_delay_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // 1. Load the task pool
    let tasks = match JsonTaskProvider::from_path(&args.tasks) {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    if tasks.task_count() == 0 {
        tracing::warn!("Task file {} is empty, games cannot start", args.tasks.display());
    } else {
        tracing::info!("Loaded {} tasks", tasks.task_count());
    }

    // 2. Runtime configuration
    let config = GameConfig {
        rules: GameRules {
            game_seconds: args.game_seconds,
            voting_seconds: args.voting_seconds,
        },
        reveal_delay: Duration::from_millis(args.reveal_delay_ms),
        ..GameConfig::default()
    };

    // 3. Repository, MessagePusher factory and Hub
    let repository = Arc::new(InMemoryRoomRepository::new());
    let pusher_factory: PusherFactory =
        Arc::new(|| Box::new(WebSocketMessagePusher::new()) as Box<dyn MessagePusher>);
    let hub = Hub::spawn(
        repository,
        Arc::new(tasks),
        Arc::new(SystemClock),
        pusher_factory,
        config.clone(),
    );

    // 4. Create and run the server
    let server = Server::new(hub, config);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
