use std::{io::ErrorKind, path::PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::{fs::File, io::AsyncReadExt};
use tracing::{debug, warn};

use crate::reminder::task::Task;

use super::TaskSetProvider;

/// Reads tasks from a JSON array exported by the task store. The file is read again on every
/// call, so edits show up on the next tick.
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read_contents(&self) -> Result<Option<String>, std::io::Error> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        // The exporter may be rewriting the file right now.
        file.lock_shared()?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        read?;
        Ok(Some(contents))
    }
}

/// Parses a task list, skipping entries that aren't valid tasks. Might happen when the exporter
/// writes a newer format.
pub fn parse_tasks(contents: &str) -> Result<Vec<Task>> {
    if contents.trim().is_empty() {
        return Ok(vec![]);
    }
    let values = serde_json::from_str::<Vec<serde_json::Value>>(contents)?;
    let tasks = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Task>(value.clone()) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!("Found illegal task {value}: {e}");
                None
            }
        })
        .collect();
    Ok(tasks)
}

#[async_trait]
impl TaskSetProvider for JsonFileProvider {
    async fn current_tasks(&self) -> Result<Vec<Task>> {
        match self.read_contents().await? {
            Some(contents) => parse_tasks(&contents),
            None => {
                debug!("Task file {:?} doesn't exist yet", self.path);
                Ok(vec![])
            }
        }
    }
}
