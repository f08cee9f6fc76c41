//! Live alerts. Each raised reminder gets an [AlertInstance]: a sound pulse repeating on its own
//! timer, a platform notification, and a handle the presentation layer uses to acknowledge it.
//! Instances are kept in a registry keyed by task id so they can all be stopped at teardown.

use std::{
    collections::HashMap,
    fmt::Display,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    time::Duration,
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::utils::clock::Clock;

use super::{
    notifier::PassiveNotifier,
    sound::{AlertSound, Tone},
    task::{Task, TaskId},
};

type Registry = Mutex<HashMap<TaskId, AlertInstance>>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // State behind these locks stays consistent between statements, a panic elsewhere doesn't
    // invalidate it.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy)]
pub struct AlertTimings {
    pub pulse_interval: Duration,
    pub popup_timeout: Duration,
    pub passive_timeout: Duration,
}

impl Default for AlertTimings {
    fn default() -> Self {
        Self {
            pulse_interval: Duration::from_millis(1500),
            popup_timeout: Duration::from_secs(60),
            passive_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Sounding,
    /// Visible but quiet. Either the user stopped the sound or there was no sound to begin with.
    Silenced,
    Stopped(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Acknowledged,
    Expired,
    Replaced,
    Teardown,
}

impl Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Acknowledged => write!(f, "acknowledged"),
            StopReason::Expired => write!(f, "expired"),
            StopReason::Replaced => write!(f, "replaced"),
            StopReason::Teardown => write!(f, "teardown"),
        }
    }
}

struct AlertInner {
    serial: u64,
    task: Task,
    state: Mutex<AlertState>,
    /// Latest pulse, possibly still playing
    tone: Mutex<Tone>,
    lifetime: CancellationToken,
    pulses: CancellationToken,
    registry: Weak<Registry>,
}

/// Handle to one live alert. Clones refer to the same alert.
#[derive(Clone)]
pub struct AlertInstance {
    inner: Arc<AlertInner>,
}

impl std::fmt::Debug for AlertInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertInstance")
            .field("serial", &self.inner.serial)
            .field("task_id", &self.inner.task.id)
            .field("state", &self.state())
            .finish()
    }
}

impl AlertInstance {
    pub fn task_id(&self) -> &TaskId {
        &self.inner.task.id
    }

    pub fn task(&self) -> &Task {
        &self.inner.task
    }

    pub fn state(&self) -> AlertState {
        *lock(&self.inner.state)
    }

    pub fn is_live(&self) -> bool {
        !matches!(self.state(), AlertState::Stopped(_))
    }

    pub fn is_sounding(&self) -> bool {
        self.state() == AlertState::Sounding
    }

    /// Whether the pulse schedule is still running.
    pub fn has_scheduled_pulses(&self) -> bool {
        !self.inner.pulses.is_cancelled()
    }

    pub fn same_as(&self, other: &AlertInstance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Acknowledges the alert. Stopping twice is a no-op.
    pub fn stop(&self) {
        self.stop_with(StopReason::Acknowledged);
    }

    /// Stops the sound only. The alert stays live until it's stopped or expires.
    pub fn silence(&self) {
        {
            let mut state = lock(&self.inner.state);
            if *state != AlertState::Sounding {
                return;
            }
            *state = AlertState::Silenced;
            self.cut_tone();
        }
        self.inner.pulses.cancel();
        debug!("Silenced alert for task {}", self.task_id());
    }

    pub(crate) fn stop_with(&self, reason: StopReason) {
        {
            let mut state = lock(&self.inner.state);
            if matches!(*state, AlertState::Stopped(_)) {
                return;
            }
            // Holding the state lock waits out a pulse that is playing right now.
            *state = AlertState::Stopped(reason);
            self.cut_tone();
        }
        self.inner.lifetime.cancel();
        self.deregister();
        info!("Stopped alert for task {} ({reason})", self.task_id());
    }

    /// Callers hold the state lock.
    fn cut_tone(&self) {
        std::mem::take(&mut *lock(&self.inner.tone)).cut();
    }

    fn deregister(&self) {
        let Some(registry) = self.inner.registry.upgrade() else {
            return;
        };
        let mut registry = lock(&registry);
        // The task may already be owned by a newer alert.
        if registry
            .get(self.task_id())
            .is_some_and(|current| current.same_as(self))
        {
            registry.remove(self.task_id());
        }
    }

    /// Plays one pulse if the alert is still sounding. Returns whether pulses should continue.
    fn pulse(&self, sound: &dyn AlertSound) -> bool {
        let mut state = lock(&self.inner.state);
        if *state != AlertState::Sounding {
            return false;
        }
        match sound.play_tone() {
            Ok(tone) => {
                // A pulse never overlaps the next one.
                std::mem::replace(&mut *lock(&self.inner.tone), tone).cut();
                trace!("Pulse for task {}", self.task_id());
                true
            }
            Err(e) => {
                warn!(
                    "Couldn't play alert sound for task {}, continuing without sound: {e:?}",
                    self.task_id()
                );
                *state = AlertState::Silenced;
                drop(state);
                self.inner.pulses.cancel();
                false
            }
        }
    }
}

/// Raises alerts and keeps track of the live ones.
pub struct AlertManager {
    registry: Arc<Registry>,
    sound: Arc<dyn AlertSound>,
    notifier: Option<Arc<dyn PassiveNotifier>>,
    clock: Arc<dyn Clock>,
    timings: AlertTimings,
    next_serial: AtomicU64,
}

impl AlertManager {
    pub fn new(
        sound: Arc<dyn AlertSound>,
        notifier: Option<Arc<dyn PassiveNotifier>>,
        clock: Arc<dyn Clock>,
        timings: AlertTimings,
    ) -> Self {
        Self {
            registry: Default::default(),
            sound,
            notifier,
            clock,
            timings,
            next_serial: AtomicU64::new(0),
        }
    }

    /// Starts an alert for `task`. The first pulse plays before this returns. Never fails, an alert
    /// without working sound or notifications is still shown to subscribers.
    ///
    /// Has to be called within a tokio runtime.
    pub fn raise(&self, task: &Task) -> AlertInstance {
        let lifetime = CancellationToken::new();
        let alert = AlertInstance {
            inner: Arc::new(AlertInner {
                serial: self.next_serial.fetch_add(1, Ordering::Relaxed),
                task: task.clone(),
                state: Mutex::new(AlertState::Sounding),
                tone: Mutex::default(),
                pulses: lifetime.child_token(),
                lifetime,
                registry: Arc::downgrade(&self.registry),
            }),
        };
        // Lookup and insert under one guard, a replaced alert never stays unregistered.
        let previous = lock(&self.registry).insert(task.id.clone(), alert.clone());
        if let Some(previous) = previous {
            previous.stop_with(StopReason::Replaced);
        }

        if !self.sound.is_available() {
            debug!("No sound available, alert for task {} is visual only", task.id);
            {
                let mut state = lock(&alert.inner.state);
                if *state == AlertState::Sounding {
                    *state = AlertState::Silenced;
                }
            }
            alert.inner.pulses.cancel();
        } else if alert.pulse(&*self.sound) {
            self.schedule_pulses(&alert);
        }

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.show(task, self.timings.passive_timeout) {
                warn!("Couldn't show notification for task {}: {e:?}", task.id);
            }
        }

        self.schedule_expiry(&alert);
        info!("Raised alert for task {}", task.id);
        alert
    }

    fn schedule_pulses(&self, alert: &AlertInstance) {
        let alert = alert.clone();
        let sound = self.sound.clone();
        let clock = self.clock.clone();
        let interval = self.timings.pulse_interval;
        let mut next_pulse = clock.instant();
        tokio::spawn(async move {
            let token = alert.inner.pulses.clone();
            loop {
                next_pulse += interval;
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = clock.sleep_until(next_pulse) => ()
                }
                if !alert.pulse(&*sound) {
                    break;
                }
            }
        });
    }

    fn schedule_expiry(&self, alert: &AlertInstance) {
        let alert = alert.clone();
        let clock = self.clock.clone();
        let timeout = self.timings.popup_timeout;
        tokio::spawn(async move {
            let token = alert.inner.lifetime.clone();
            tokio::select! {
                _ = token.cancelled() => (),
                _ = clock.sleep(timeout) => alert.stop_with(StopReason::Expired),
            }
        });
    }

    pub fn get(&self, id: &str) -> Option<AlertInstance> {
        lock(&self.registry).get(id).cloned()
    }

    pub fn live(&self) -> Vec<AlertInstance> {
        lock(&self.registry).values().cloned().collect()
    }

    pub fn live_count(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Stops every live alert.
    pub fn stop_all(&self, reason: StopReason) {
        // Stopping takes the registry lock again, so work on a snapshot.
        let live = self.live();
        if !live.is_empty() {
            info!("Stopping {} live alerts", live.len());
        }
        for alert in live {
            alert.stop_with(reason);
        }
    }
}

impl Drop for AlertManager {
    fn drop(&mut self) {
        self.stop_all(StopReason::Teardown);
    }
}
