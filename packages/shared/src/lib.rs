//! Utilities shared by the LGTM server binary and its tests.

pub mod logger;
pub mod time;
