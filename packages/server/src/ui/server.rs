//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::usecase::{GameConfig, Hub};

use super::{
    handler::{get_room_detail, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// LGTM game server
///
/// This struct encapsulates the server dependencies and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let hub = Hub::spawn(repository, tasks, clock, pusher_factory, config.clone());
/// let server = Server::new(hub, config);
/// server.run("127.0.0.1".to_string(), 3001).await?;
/// ```
pub struct Server {
    /// Hub（接続レジストリとルームディレクトリ）
    hub: Hub,
    config: GameConfig,
}

impl Server {
    pub fn new(hub: Hub, config: GameConfig) -> Self {
        Self { hub, config }
    }

    /// Build the router: `/ws` plus the JSON inspection endpoints.
    pub fn router(self) -> Router {
        let app_state = Arc::new(AppState {
            hub: self.hub,
            config: self.config,
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{code}", get(get_room_detail))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the game server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 3001)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("LGTM server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until a shutdown signal arrives.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}
