//! TaskProvider の実装

pub mod json_file;

pub use json_file::{JsonTaskProvider, TaskLoadError};
