//! Shared application state.

use crate::usecase::{GameConfig, Hub};

/// Shared application state
pub struct AppState {
    /// Hub（接続レジストリとルームディレクトリ）
    pub hub: Hub,
    pub config: GameConfig,
}
