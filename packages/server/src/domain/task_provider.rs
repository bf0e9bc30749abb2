//! TaskProvider trait: read-only source of puzzle definitions.

use super::entity::Task;

#[cfg_attr(test, mockall::automock)]
pub trait TaskProvider: Send + Sync {
    /// Pick one task uniformly at random, or `None` when no task is loaded.
    fn pick_random_task(&self) -> Option<Task>;

    fn task_count(&self) -> usize;
}
