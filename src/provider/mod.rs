//! Sources of the live task set. The reminder engine never owns tasks, it pulls a fresh snapshot
//! through [TaskSetProvider] on every tick.

pub mod file;

use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::reminder::task::Task;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskSetProvider: Send + Sync {
    async fn current_tasks(&self) -> Result<Vec<Task>>;
}

/// In-memory task set. The host application replaces the snapshot whenever its tasks change.
#[derive(Clone, Default)]
pub struct SharedTaskSet {
    tasks: Arc<RwLock<Vec<Task>>>,
}

impl SharedTaskSet {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(tasks)),
        }
    }

    pub fn replace(&self, tasks: Vec<Task>) {
        *self.tasks.write().unwrap_or_else(|e| e.into_inner()) = tasks;
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TaskSetProvider for SharedTaskSet {
    async fn current_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.snapshot())
    }
}
