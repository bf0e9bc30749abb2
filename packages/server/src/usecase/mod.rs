//! UseCase layer: the hub and the per-room session actors.

pub mod config;
pub mod hub;
pub mod room_session;
pub mod ticker;

pub use config::GameConfig;
pub use hub::{Hub, HubCommand, PusherFactory};
pub use room_session::RoomSession;
pub use ticker::Ticker;
