//! UI layer: the axum router, WebSocket connections and HTTP inspection endpoints.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
