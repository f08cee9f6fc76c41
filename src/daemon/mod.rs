use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    provider::{file::JsonFileProvider, TaskSetProvider},
    reminder::{
        notifier::{DesktopNotifier, PassiveNotifier},
        poller::ReminderPoller,
        service::{ReminderFired, ReminderService},
        sound::create_sound,
        ReminderConfig,
    },
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod shutdown;

/// Represents the starting point for the daemon
pub async fn start_daemon(tasks_path: PathBuf, config: ReminderConfig) -> Result<()> {
    std::env::set_current_dir("/")?;
    info!("Watching reminders of {tasks_path:?}");

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let service = Arc::new(create_service(&config, clock.clone()));
    let shutdown_token = CancellationToken::new();

    let poller = create_poller(
        service.clone(),
        JsonFileProvider::new(tasks_path),
        &shutdown_token,
        &config,
        clock,
    );

    let (_, poller_result, _) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone(), service.clone()),
        poller.run(),
        log_reminders(service.subscribe(), &shutdown_token),
    );

    if let Err(poller_result) = poller_result {
        error!("Reminder poller got an error {:?}", poller_result);
    }

    Ok(())
}

/// Builds the service the way it's configured. Sound and notifier degrade by themselves when the
/// platform doesn't support them.
pub fn create_service(config: &ReminderConfig, clock: Arc<dyn Clock>) -> ReminderService {
    let notifier: Option<Arc<dyn PassiveNotifier>> = if config.desktop_notifications {
        Some(Arc::new(DesktopNotifier))
    } else {
        None
    };
    ReminderService::new(config, clock, Arc::from(create_sound(config.sound)), notifier)
}

pub fn create_poller(
    service: Arc<ReminderService>,
    provider: impl TaskSetProvider + 'static,
    shutdown_token: &CancellationToken,
    config: &ReminderConfig,
    clock: Arc<dyn Clock>,
) -> ReminderPoller {
    ReminderPoller::new(
        service,
        Box::new(provider),
        shutdown_token.clone(),
        config.poll_interval,
        clock,
    )
}

/// The daemon has no window to show reminders in, they end up in the log next to the desktop
/// notification.
async fn log_reminders(
    mut events: broadcast::Receiver<ReminderFired>,
    shutdown_token: &CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => return,
            event = events.recv() => match event {
                Ok(ReminderFired { task, .. }) => {
                    info!("Reminder: {} [{}] due at {:?}", task.title, task.id, task.reminder_time)
                }
                Err(RecvError::Lagged(skipped)) => warn!("Missed {skipped} reminder events"),
                Err(RecvError::Closed) => return,
            }
        }
    }
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{create_poller, log_reminders},
        provider::file::JsonFileProvider,
        reminder::{
            service::ReminderService, sound::testing::CountingSound, task::Task, ReminderConfig,
        },
        utils::{
            clock::{Clock, TestClock},
            logging::TEST_LOGGING,
        },
    };

    /// Smoke test running the daemon pipeline against a task file that changes underneath it.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let start = Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap();
        let clock = Arc::new(TestClock::starting_at(start));
        let sound = CountingSound::default();
        let config = ReminderConfig::default();
        let service = Arc::new(ReminderService::new(
            &config,
            clock.clone(),
            Arc::new(sound.clone()),
            None,
        ));

        let dir = tempdir()?;
        let path = dir.path().join("tasks.json");
        let tasks = vec![
            Task::new("t1", "due").with_reminder(start - chrono::Duration::hours(1)),
            Task::new("t2", "later").with_reminder(start + chrono::Duration::seconds(3)),
            Task::new("t3", "muted")
                .with_reminder(start)
                .with_notification(false),
        ];
        std::fs::write(&path, serde_json::to_string(&tasks)?)?;

        let shutdown_token = CancellationToken::new();
        let poller = create_poller(
            service.clone(),
            JsonFileProvider::new(path.clone()),
            &shutdown_token,
            &config,
            clock.clone(),
        );

        let (poller_result, _, _) = tokio::join!(
            poller.run(),
            log_reminders(service.subscribe(), &shutdown_token),
            async {
                clock.sleep(Duration::from_millis(500)).await;
                assert!(service.alert_for("t1").is_some());
                assert!(service.alert_for("t2").is_none());

                clock.sleep(Duration::from_secs(3)).await;
                assert!(service.alert_for("t2").is_some());
                assert!(service.alert_for("t3").is_none());
                shutdown_token.cancel();
            }
        );
        poller_result?;

        assert!(service.live_alerts().is_empty());
        assert!(sound.plays() >= 2);
        Ok(())
    }
}
