use std::{fmt::Display, sync::Arc};

use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TaskId = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
        }
    }
}

/// A task as exported by the task store. Only `id`, `reminder_time`, `notification_enabled` and
/// `status` decide whether a reminder fires, everything else is carried along for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub title: Arc<str>,
    #[serde(default)]
    pub description: Arc<str>,
    #[serde(default)]
    pub category: Arc<str>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub reminder_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notification_enabled: bool,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, title: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: "".into(),
            category: "".into(),
            priority: Priority::default(),
            status: TaskStatus::default(),
            reminder_time: None,
            notification_enabled: false,
        }
    }

    pub fn with_reminder(self, reminder_time: DateTime<Utc>) -> Self {
        Self {
            reminder_time: Some(reminder_time),
            notification_enabled: true,
            ..self
        }
    }

    pub fn with_status(self, status: TaskStatus) -> Self {
        Self { status, ..self }
    }

    pub fn with_notification(self, notification_enabled: bool) -> Self {
        Self {
            notification_enabled,
            ..self
        }
    }

    /// A reminder is armed when it's enabled, has a time and the task isn't done yet. Whether it
    /// already fired is tracked separately.
    pub fn is_armed(&self) -> bool {
        self.notification_enabled
            && self.reminder_time.is_some()
            && self.status != TaskStatus::Completed
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.id.trim().is_empty(), "Task {:?} has an empty id", self.title);
        Ok(())
    }
}
