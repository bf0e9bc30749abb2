//! Data Transfer Objects (DTOs).
//!
//! DTOs are organized by protocol:
//! - `websocket`: inbound envelope and outbound event frames
//! - `http`: inspection API responses and the task file format

pub mod conversion;
pub mod http;
pub mod websocket;
