use std::sync::Arc;

use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::reminder::service::ReminderService;

use signals::Listener;

#[cfg(unix)]
mod signals {
    use tokio::signal::unix::{signal, Signal, SignalKind};
    use tracing::warn;

    pub struct Listener(Option<Signal>);

    impl Listener {
        pub fn terminate() -> Self {
            Self::new(SignalKind::terminate())
        }

        pub fn hangup() -> Self {
            Self::new(SignalKind::hangup())
        }

        fn new(kind: SignalKind) -> Self {
            Self(
                signal(kind)
                    .inspect_err(|e| warn!("Can't listen for signal {kind:?} {e:?}"))
                    .ok(),
            )
        }

        /// Never resolves if the signal can't be listened for.
        pub async fn recv(&mut self) {
            if let Some(signal) = &mut self.0 {
                if signal.recv().await.is_some() {
                    return;
                }
            }
            std::future::pending().await
        }
    }
}

#[cfg(not(unix))]
mod signals {
    pub struct Listener;

    impl Listener {
        pub fn terminate() -> Self {
            Self
        }

        pub fn hangup() -> Self {
            Self
        }

        pub async fn recv(&mut self) {
            std::future::pending().await
        }
    }
}

/// Detects signals sent to the process. Ctrl-C and SIGTERM cancel `cancelation`. SIGHUP means the
/// session went away: alerts are stopped, but reminders keep being checked.
///
/// On Windows detached processes can't detect signals sent to them, so this should be enhanced in the future to
/// support another way of sending signals.
pub async fn detect_shutdown(cancelation: CancellationToken, service: Arc<ReminderService>) {
    let mut terminate = Listener::terminate();
    let mut hangup = Listener::hangup();
    loop {
        select! {
            _ = tokio::signal::ctrl_c() => {
                cancelation.cancel();
                return;
            },
            _ = terminate.recv() => {
                cancelation.cancel();
                return;
            },
            _ = hangup.recv() => {
                info!("Session hung up, stopping alerts");
                service.visibility_changed(false);
            },
            _ = cancelation.cancelled() => return,
        };
    }
}
