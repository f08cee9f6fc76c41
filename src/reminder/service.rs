use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::utils::clock::Clock;

use super::{
    alert::{lock, AlertInstance, AlertManager, StopReason},
    evaluator::ReminderEvaluator,
    notifier::PassiveNotifier,
    sound::AlertSound,
    task::Task,
    ReminderConfig,
};

const EVENT_CAPACITY: usize = 64;

/// Sent to subscribers every time a reminder fires. The alert is live when the event is sent, the
/// receiver acknowledges it through [AlertInstance::stop].
#[derive(Debug, Clone)]
pub struct ReminderFired {
    pub task: Task,
    pub alert: AlertInstance,
}

/// Owns all reminder state of a process: which tasks were already notified and which alerts are
/// live. Create one per process and share it through an [Arc].
pub struct ReminderService {
    evaluator: Mutex<ReminderEvaluator>,
    alerts: AlertManager,
    events: broadcast::Sender<ReminderFired>,
    clock: Arc<dyn Clock>,
}

impl ReminderService {
    pub fn new(
        config: &ReminderConfig,
        clock: Arc<dyn Clock>,
        sound: Arc<dyn AlertSound>,
        notifier: Option<Arc<dyn PassiveNotifier>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            evaluator: Mutex::new(ReminderEvaluator::new(config.rearm)),
            alerts: AlertManager::new(sound, notifier, clock.clone(), config.alert_timings()),
            events,
            clock,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReminderFired> {
        self.events.subscribe()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.time()
    }

    /// Raises alerts for tasks that became due at `now`. Marking a task and raising its alert
    /// happen under one lock, so concurrent checks can't raise the same reminder twice.
    pub fn check_tasks(&self, tasks: &[Task], now: DateTime<Utc>) -> Vec<AlertInstance> {
        let mut evaluator = lock(&self.evaluator);
        let due = evaluator.evaluate_tasks(tasks, now);
        if due.is_empty() {
            return vec![];
        }

        due.into_iter()
            .map(|task| {
                info!("Reminder for task {} ({}) is due", task.id, task.title);
                let alert = self.alerts.raise(task);
                // No subscribers is fine, the alert still sounds and expires on its own.
                let _ = self.events.send(ReminderFired {
                    task: task.clone(),
                    alert: alert.clone(),
                });
                alert
            })
            .collect()
    }

    /// Checks `tasks` against the current time. Hosts call this right after their task list
    /// changes so they don't have to wait for the next poll.
    pub fn check_now(&self, tasks: &[Task]) -> Vec<AlertInstance> {
        self.check_tasks(tasks, self.clock.time())
    }

    /// Arms the task again, for example after its reminder was edited.
    pub fn clear_notification(&self, task_id: &str) {
        if lock(&self.evaluator).clear(task_id) {
            debug!("Cleared notification mark of task {task_id}");
        }
    }

    pub fn is_notified(&self, task_id: &str) -> bool {
        lock(&self.evaluator).is_notified(task_id)
    }

    pub fn alert_for(&self, task_id: &str) -> Option<AlertInstance> {
        self.alerts.get(task_id)
    }

    pub fn live_alerts(&self) -> Vec<AlertInstance> {
        self.alerts.live()
    }

    pub fn stop_all_sounds(&self) {
        self.alerts.stop_all(StopReason::Teardown);
    }

    /// Alerts don't keep going while nobody can see them. Polling continues, so reminders that
    /// become due later are still raised.
    pub fn visibility_changed(&self, visible: bool) {
        if !visible {
            debug!("Lost visibility, stopping alerts");
            self.stop_all_sounds();
        }
    }

    /// Stops every alert and forgets what was notified.
    pub fn shutdown(&self) {
        self.stop_all_sounds();
        lock(&self.evaluator).reset();
        info!("Reminder service shut down");
    }
}
