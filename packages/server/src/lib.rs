//! LGTM session server.
//!
//! Hosts the real-time sessions of a four-player social-deduction coding game:
//! a hub that tracks connections and rooms, one serialized state machine per
//! room, and the WebSocket/HTTP surface in front of them.

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
