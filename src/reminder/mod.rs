//! Reminder engine. The [poller::ReminderPoller] wakes up at a fixed cadence, pulls the current
//! tasks and hands them to [service::ReminderService], which decides what is due
//! ([evaluator::ReminderEvaluator]) and raises alerts ([alert::AlertManager]).

use std::time::Duration;

use alert::AlertTimings;
use clap::Args;
use evaluator::RearmPolicy;
use sound::SoundKind;

pub mod alert;
pub mod countdown;
pub mod evaluator;
pub mod notified;
pub mod notifier;
pub mod poller;
pub mod service;
pub mod sound;
pub mod task;

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub poll_interval: Duration,
    pub pulse_interval: Duration,
    pub popup_timeout: Duration,
    pub passive_timeout: Duration,
    pub rearm: RearmPolicy,
    pub sound: SoundKind,
    pub desktop_notifications: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        let timings = AlertTimings::default();
        Self {
            poll_interval: Duration::from_secs(1),
            pulse_interval: timings.pulse_interval,
            popup_timeout: timings.popup_timeout,
            passive_timeout: timings.passive_timeout,
            rearm: RearmPolicy::default(),
            sound: SoundKind::System,
            desktop_notifications: true,
        }
    }
}

impl ReminderConfig {
    pub fn alert_timings(&self) -> AlertTimings {
        AlertTimings {
            pulse_interval: self.pulse_interval,
            popup_timeout: self.popup_timeout,
            passive_timeout: self.passive_timeout,
        }
    }
}

/// Reminder options shared by the cli and the daemon.
#[derive(Args, Debug, Clone)]
pub struct ReminderArgs {
    #[arg(long = "poll-ms", default_value_t = 1000, help = "How often tasks are checked")]
    pub poll_ms: u64,
    #[arg(long = "pulse-ms", default_value_t = 1500, help = "How often the alert sound repeats")]
    pub pulse_ms: u64,
    #[arg(
        long = "popup-timeout-s",
        default_value_t = 60,
        help = "Alerts that aren't acknowledged are dismissed after this many seconds"
    )]
    pub popup_timeout_s: u64,
    #[arg(
        long = "passive-timeout-s",
        default_value_t = 30,
        help = "Desktop notifications close after this many seconds"
    )]
    pub passive_timeout_s: u64,
    #[arg(
        long,
        default_value_t = RearmPolicy::Never,
        help = "Whether a task that already fired is notified again after its reminder is edited"
    )]
    pub rearm: RearmPolicy,
    #[arg(long, help = "Alert sound. Defaults to the system player for the daemon and the terminal bell for the cli")]
    pub sound: Option<SoundKind>,
    #[arg(long = "no-desktop", help = "Don't show desktop notifications")]
    pub no_desktop: bool,
}

impl ReminderArgs {
    pub fn into_config(self, default_sound: SoundKind) -> ReminderConfig {
        ReminderConfig {
            // A zero cadence would spin.
            poll_interval: Duration::from_millis(self.poll_ms.max(1)),
            pulse_interval: Duration::from_millis(self.pulse_ms.max(1)),
            popup_timeout: Duration::from_secs(self.popup_timeout_s),
            passive_timeout: Duration::from_secs(self.passive_timeout_s),
            rearm: self.rearm,
            sound: self.sound.unwrap_or(default_sound),
            desktop_notifications: !self.no_desktop,
        }
    }
}
