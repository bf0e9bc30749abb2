//! Runtime configuration of rooms and connections.

use std::time::Duration;

use crate::domain::GameRules;

/// Tunables shared by the hub, every room and every connection.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Clock lengths.
    pub rules: GameRules,
    /// Period of both phase clocks.
    pub tick_interval: Duration,
    /// Pause between `voting-ended` and the win-condition check.
    pub reveal_delay: Duration,
    /// Frames buffered per connection before it is considered stalled.
    pub outbound_queue_capacity: usize,
    pub room_queue_capacity: usize,
    pub hub_queue_capacity: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            tick_interval: Duration::from_secs(1),
            reveal_delay: Duration::from_secs(3),
            outbound_queue_capacity: 256,
            room_queue_capacity: 256,
            hub_queue_capacity: 256,
        }
    }
}
