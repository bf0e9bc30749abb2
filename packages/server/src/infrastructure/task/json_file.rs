//! Task pool loaded once from a JSON file at startup.

use std::{
    fs,
    path::{Path, PathBuf},
};

use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::{
    domain::{Task, TaskProvider},
    infrastructure::dto::http::TaskDto,
};

#[derive(Debug, Error)]
pub enum TaskLoadError {
    #[error("failed to read task file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse task file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only, in-memory task pool.
#[derive(Debug, Clone, Default)]
pub struct JsonTaskProvider {
    tasks: Vec<Task>,
}

impl JsonTaskProvider {
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Load `[{id, title, description, functionName, starterCode, testCases}]`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TaskLoadError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| TaskLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| TaskLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let dtos: Vec<TaskDto> = serde_json::from_str(raw)?;
        Ok(Self::from_tasks(dtos.into_iter().map(Task::from).collect()))
    }
}

impl TaskProvider for JsonTaskProvider {
    fn pick_random_task(&self) -> Option<Task> {
        self.tasks.choose(&mut rand::rng()).cloned()
    }

    fn task_count(&self) -> usize {
        self.tasks.len()
    }
}
