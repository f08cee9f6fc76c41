use std::{collections::HashMap, fmt::Display};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    notified::NotifiedSet,
    task::{Task, TaskId},
};

/// What happens to a task that already fired once when its reminder gets edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RearmPolicy {
    /// A fired task stays silent until it's cleared explicitly.
    #[default]
    Never,
    /// A fired task is armed again once its reminder time or its notification flag changes.
    OnChange,
}

impl Display for RearmPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RearmPolicy::Never => write!(f, "never"),
            RearmPolicy::OnChange => write!(f, "on-change"),
        }
    }
}

/// Reminder settings a task had at the moment it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReminderFingerprint {
    reminder_time: Option<DateTime<Utc>>,
    notification_enabled: bool,
}

impl From<&Task> for ReminderFingerprint {
    fn from(task: &Task) -> Self {
        Self {
            reminder_time: task.reminder_time,
            notification_enabled: task.notification_enabled,
        }
    }
}

/// Decides which tasks have newly become due. Every task it reports is marked in the
/// [NotifiedSet] before being returned, so the caller can only dispatch already marked tasks.
#[derive(Debug, Default)]
pub struct ReminderEvaluator {
    notified: NotifiedSet,
    policy: RearmPolicy,
    fired_with: HashMap<TaskId, ReminderFingerprint>,
}

impl ReminderEvaluator {
    pub fn new(policy: RearmPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Returns ids of tasks that became due at `now`, in the order of `tasks`.
    pub fn evaluate(&mut self, tasks: &[Task], now: DateTime<Utc>) -> Vec<TaskId> {
        self.evaluate_tasks(tasks, now)
            .into_iter()
            .map(|task| task.id.clone())
            .collect()
    }

    /// Same as [ReminderEvaluator::evaluate] but hands back the tasks themselves.
    pub fn evaluate_tasks<'a>(&mut self, tasks: &'a [Task], now: DateTime<Utc>) -> Vec<&'a Task> {
        let mut due = vec![];
        for task in tasks {
            if let Err(e) = task.validate() {
                warn!("Skipping malformed task: {e}");
                continue;
            }

            if self.policy == RearmPolicy::OnChange {
                self.rearm_if_changed(task);
            }

            if !Self::is_due(task, now) || self.notified.contains(&task.id) {
                continue;
            }

            // A task listed twice in the same snapshot must still fire once.
            if self.notified.insert(task.id.clone()) {
                self.fired_with.insert(task.id.clone(), task.into());
                due.push(task);
            }
        }
        due
    }

    fn is_due(task: &Task, now: DateTime<Utc>) -> bool {
        task.is_armed() && task.reminder_time.is_some_and(|time| time <= now)
    }

    fn rearm_if_changed(&mut self, task: &Task) {
        let Some(fired_with) = self.fired_with.get(&task.id) else {
            return;
        };
        if *fired_with != ReminderFingerprint::from(task) {
            debug!("Reminder of task {} changed, arming it again", task.id);
            self.clear(&task.id);
        }
    }

    pub fn is_notified(&self, id: &str) -> bool {
        self.notified.contains(id)
    }

    /// Arms a task again. Returns whether it was marked as notified.
    pub fn clear(&mut self, id: &str) -> bool {
        self.fired_with.remove(id);
        self.notified.remove(id)
    }

    pub fn notified_count(&self) -> usize {
        self.notified.len()
    }

    pub fn reset(&mut self) {
        self.notified.clear();
        self.fired_with.clear();
    }
}
