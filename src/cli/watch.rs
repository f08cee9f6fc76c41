use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    daemon::{create_poller, create_service, shutdown::detect_shutdown},
    provider::file::JsonFileProvider,
    reminder::{
        alert::AlertInstance,
        service::{ReminderFired, ReminderService},
        ReminderConfig,
    },
    utils::clock::{Clock, DefaultClock},
};

use super::output::render_reminder;

/// What the user typed while watching.
#[derive(Debug, PartialEq, Eq)]
enum WatchInput {
    /// Acknowledge the most recent live alert
    Latest,
    All,
    Acknowledge(String),
    Silence(String),
    Quit,
}

impl WatchInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.split_once(char::is_whitespace) {
            Some(("s" | "silence", id)) => Self::Silence(id.trim().to_string()),
            _ => match line {
                "" => Self::Latest,
                "all" => Self::All,
                "q" | "quit" => Self::Quit,
                id => Self::Acknowledge(id.to_string()),
            },
        }
    }
}

/// Alerts shown in this terminal, oldest first.
struct Acknowledger {
    service: Arc<ReminderService>,
    shown: Vec<AlertInstance>,
}

impl Acknowledger {
    fn new(service: Arc<ReminderService>) -> Self {
        Self {
            service,
            shown: vec![],
        }
    }

    fn show(&mut self, alert: AlertInstance) {
        self.shown.retain(|v| v.is_live());
        self.shown.push(alert);
    }

    /// Applies the input and returns a message for the user.
    fn apply(&mut self, input: WatchInput, shutdown_token: &CancellationToken) -> String {
        self.shown.retain(|v| v.is_live());
        match input {
            WatchInput::Latest => match self.shown.pop() {
                Some(alert) => {
                    alert.stop();
                    format!("Acknowledged {}", alert.task().title)
                }
                None => "No active reminders".into(),
            },
            WatchInput::All => {
                let count = self.shown.len();
                self.service.stop_all_sounds();
                self.shown.clear();
                format!("Acknowledged {count} reminders")
            }
            WatchInput::Acknowledge(id) => match self.service.alert_for(&id) {
                Some(alert) => {
                    alert.stop();
                    format!("Acknowledged {}", alert.task().title)
                }
                None => format!("No active reminder for task {id}"),
            },
            WatchInput::Silence(id) => match self.service.alert_for(&id) {
                Some(alert) => {
                    alert.silence();
                    format!("Stopped sound of {}", alert.task().title)
                }
                None => format!("No active reminder for task {id}"),
            },
            WatchInput::Quit => {
                shutdown_token.cancel();
                "Stopping".into()
            }
        }
    }
}

/// Reads stdin on a dedicated thread. A blocked tokio stdin read would hold up runtime shutdown.
fn spawn_input_reader() -> mpsc::UnboundedReceiver<String> {
    let (sender, receiver) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else {
                break;
            };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

async fn acknowledge_loop(
    mut events: broadcast::Receiver<ReminderFired>,
    mut input: mpsc::UnboundedReceiver<String>,
    mut acknowledger: Acknowledger,
    shutdown_token: &CancellationToken,
) {
    let mut input_open = true;
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => return,
            event = events.recv() => match event {
                Ok(ReminderFired { task, alert }) => {
                    println!("\n{}\n", render_reminder(&task));
                    acknowledger.show(alert);
                }
                Err(RecvError::Lagged(skipped)) => warn!("Missed {skipped} reminder events"),
                Err(RecvError::Closed) => return,
            },
            line = input.recv(), if input_open => match line {
                Some(line) => {
                    println!("{}", acknowledger.apply(WatchInput::parse(&line), shutdown_token));
                }
                // Without input alerts still expire on their own.
                None => input_open = false,
            },
        }
    }
}

/// Runs the reminder engine in the foreground. Reminders are printed and acknowledged from this
/// terminal until Ctrl-C or `quit`.
pub async fn process_watch_command(tasks_path: PathBuf, config: ReminderConfig) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let service = Arc::new(create_service(&config, clock.clone()));
    let shutdown_token = CancellationToken::new();
    let poller = create_poller(
        service.clone(),
        JsonFileProvider::new(tasks_path.clone()),
        &shutdown_token,
        &config,
        clock,
    );

    println!("Watching reminders of {}. Ctrl-C or \"quit\" to stop", tasks_path.display());
    let (_, poller_result, _) = tokio::join!(
        detect_shutdown(shutdown_token.clone(), service.clone()),
        poller.run(),
        acknowledge_loop(
            service.subscribe(),
            spawn_input_reader(),
            Acknowledger::new(service.clone()),
            &shutdown_token,
        ),
    );
    poller_result
}
