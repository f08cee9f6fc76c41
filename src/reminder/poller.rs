use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use anyhow::Result;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{provider::TaskSetProvider, utils::clock::Clock};

use super::service::ReminderService;

/// Periodic wake-up source of the reminder engine. Every tick pulls the live task set and lets the
/// [ReminderService] raise whatever became due.
pub struct ReminderPoller {
    service: Arc<ReminderService>,
    provider: Box<dyn TaskSetProvider>,
    shutdown: CancellationToken,
    poll_frequency: Duration,
    time_provider: Arc<dyn Clock>,
}

impl ReminderPoller {
    pub fn new(
        service: Arc<ReminderService>,
        provider: Box<dyn TaskSetProvider>,
        shutdown: CancellationToken,
        poll_frequency: Duration,
        time_provider: Arc<dyn Clock>,
    ) -> Self {
        Self {
            service,
            provider,
            shutdown,
            poll_frequency,
            time_provider,
        }
    }

    /// One evaluation cycle. Returns how many reminders fired.
    async fn tick(&self) -> Result<usize> {
        let tasks = self.provider.current_tasks().await?;
        let now = self.time_provider.time();
        debug!("Checking {} tasks at {now}", tasks.len());
        Ok(self.service.check_tasks(&tasks, now).len())
    }

    /// Executes the poller event loop until shutdown is requested. A tick that fails or panics is
    /// logged and the loop carries on with the next one.
    pub async fn run(self) -> Result<()> {
        let mut poll_point = self.time_provider.instant();
        while !self.shutdown.is_cancelled() {
            poll_point += self.poll_frequency;

            let span = info_span!("Reminder tick");
            match AssertUnwindSafe(self.tick()).catch_unwind().instrument(span).await {
                Ok(Ok(0)) => (),
                Ok(Ok(fired)) => info!("Raised {fired} reminders"),
                Ok(Err(e)) => error!("Encountered an error during reminder check {e:?}"),
                Err(_) => error!("Reminder check panicked, continuing with the next tick"),
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = self.time_provider.sleep_until(poll_point) => ()
            }
        }

        // Nothing may outlive the poller, so teardown also takes every live alert down.
        self.service.shutdown();
        Ok(())
    }
}

#[cfg(test)]
mod poller_tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use tokio_util::sync::CancellationToken;

    use crate::{
        provider::{MockTaskSetProvider, SharedTaskSet, TaskSetProvider},
        reminder::{
            service::ReminderService, sound::testing::CountingSound, task::Task, ReminderConfig,
        },
        utils::{
            clock::{Clock, TestClock},
            logging::TEST_LOGGING,
        },
    };

    use super::ReminderPoller;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap()
    }

    fn setup(sound: CountingSound) -> (Arc<ReminderService>, Arc<TestClock>) {
        let clock = Arc::new(TestClock::starting_at(start()));
        let service = Arc::new(ReminderService::new(
            &ReminderConfig::default(),
            clock.clone(),
            Arc::new(sound),
            None,
        ));
        (service, clock)
    }

    fn poller(
        service: &Arc<ReminderService>,
        provider: impl TaskSetProvider + 'static,
        shutdown: &CancellationToken,
        clock: &Arc<TestClock>,
    ) -> ReminderPoller {
        ReminderPoller::new(
            service.clone(),
            Box::new(provider),
            shutdown.clone(),
            Duration::from_secs(1),
            clock.clone(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_when_reminder_comes_due() -> Result<()> {
        *TEST_LOGGING;
        let (service, clock) = setup(CountingSound::default());
        let tasks = SharedTaskSet::new(vec![
            Task::new("t1", "soon").with_reminder(start() + chrono::Duration::milliseconds(2500)),
        ]);
        let mut events = service.subscribe();
        let shutdown = CancellationToken::new();
        let poller = poller(&service, tasks.clone(), &shutdown, &clock);

        let (result, _) = tokio::join!(poller.run(), async {
            clock.sleep(Duration::from_millis(2100)).await;
            assert!(events.try_recv().is_err());

            clock.sleep(Duration::from_millis(1000)).await;
            let fired = events.try_recv().expect("reminder should have fired at 3s");
            assert_eq!(&*fired.task.id, "t1");
            assert!(fired.alert.is_live());

            // Several more ticks, still just one event.
            clock.sleep(Duration::from_secs(5)).await;
            assert!(events.try_recv().is_err());
            shutdown.cancel();
        });
        result?;

        assert!(service.live_alerts().is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_picks_up_task_changes() -> Result<()> {
        let (service, clock) = setup(CountingSound::default());
        let tasks = SharedTaskSet::default();
        let shutdown = CancellationToken::new();
        let poller = poller(&service, tasks.clone(), &shutdown, &clock);

        let (result, _) = tokio::join!(poller.run(), async {
            clock.sleep(Duration::from_millis(1500)).await;
            assert!(service.live_alerts().is_empty());

            tasks.replace(vec![Task::new("t1", "added").with_reminder(start())]);
            clock.sleep(Duration::from_secs(1)).await;
            assert!(service.alert_for("t1").is_some());
            shutdown.cancel();
        });
        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_ticks_dont_stop_the_loop() -> Result<()> {
        let (service, clock) = setup(CountingSound::default());
        let mut provider = MockTaskSetProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        provider.expect_current_tasks().returning(move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow!("task store unreachable"))
            } else {
                Ok(vec![Task::new("t1", "task").with_reminder(start())])
            }
        });
        let shutdown = CancellationToken::new();
        let poller = poller(&service, provider, &shutdown, &clock);

        let (result, _) = tokio::join!(poller.run(), async {
            clock.sleep(Duration::from_millis(2500)).await;
            assert!(service.alert_for("t1").is_some());
            shutdown.cancel();
        });
        result?;
        assert!(calls.load(Ordering::SeqCst) >= 3);
        Ok(())
    }

    struct PanickingOnce {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TaskSetProvider for PanickingOnce {
        async fn current_tasks(&self) -> Result<Vec<Task>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("corrupted snapshot");
            }
            Ok(vec![Task::new("t1", "task").with_reminder(start())])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_is_isolated() -> Result<()> {
        let (service, clock) = setup(CountingSound::default());
        let shutdown = CancellationToken::new();
        let provider = PanickingOnce {
            calls: AtomicUsize::new(0),
        };
        let poller = poller(&service, provider, &shutdown, &clock);

        let (result, _) = tokio::join!(poller.run(), async {
            clock.sleep(Duration::from_millis(1500)).await;
            assert!(service.alert_for("t1").is_some());
            shutdown.cancel();
        });
        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_alerts_and_polling() -> Result<()> {
        let sound = CountingSound::default();
        let (service, clock) = setup(sound.clone());
        let tasks = SharedTaskSet::new(vec![
            Task::new("t1", "first").with_reminder(start()),
            Task::new("t2", "second").with_reminder(start()),
        ]);
        let shutdown = CancellationToken::new();
        let poller = poller(&service, tasks.clone(), &shutdown, &clock);

        let (result, _) = tokio::join!(poller.run(), async {
            clock.sleep(Duration::from_millis(100)).await;
            assert_eq!(service.live_alerts().len(), 2);
            shutdown.cancel();
        });
        result?;

        assert!(service.live_alerts().is_empty());
        let plays = sound.plays();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sound.plays(), plays);
        Ok(())
    }

    /// Counts provider calls made after shutdown was requested.
    struct WatchingShutdown {
        shutdown: CancellationToken,
        late_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TaskSetProvider for WatchingShutdown {
        async fn current_tasks(&self) -> Result<Vec<Task>> {
            if self.shutdown.is_cancelled() {
                self.late_calls.fetch_add(1, Ordering::SeqCst);
            }
            Ok(vec![Task::new("t1", "task").with_reminder(start() + chrono::Duration::seconds(1))])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_shutdown_at_tick_boundary() -> Result<()> {
        let late_calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let (service, clock) = setup(CountingSound::default());
            let shutdown = CancellationToken::new();
            let provider = WatchingShutdown {
                shutdown: shutdown.clone(),
                late_calls: late_calls.clone(),
            };
            let poller = poller(&service, provider, &shutdown, &clock);
            let cancel_clock = clock.clone();
            let cancel_token = shutdown.clone();
            let canceller = tokio::spawn(async move {
                cancel_clock.sleep(Duration::from_secs(1)).await;
                cancel_token.cancel();
            });

            poller.run().await?;
            canceller.await?;
            assert!(service.live_alerts().is_empty());
        }
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_never_ticks() -> Result<()> {
        let (service, clock) = setup(CountingSound::default());
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let mut provider = MockTaskSetProvider::new();
        provider.expect_current_tasks().never();

        poller(&service, provider, &shutdown, &clock).run().await
    }
}
