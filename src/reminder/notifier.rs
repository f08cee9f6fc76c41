use std::time::Duration;
#[cfg(unix)]
use std::process::Stdio;

use anyhow::Result;

use crate::utils::time::format_local;

use super::task::Task;

/// Platform-level notification shown next to an alert. It closes by itself after `expire_after`.
#[cfg_attr(test, mockall::automock)]
pub trait PassiveNotifier: Send + Sync + 'static {
    fn show(&self, task: &Task, expire_after: Duration) -> Result<()>;
}

pub fn reminder_title(task: &Task) -> String {
    format!("Task Reminder: {}", task.title)
}

/// Text used by every reminder surface.
pub fn reminder_body(task: &Task) -> String {
    let mut body = String::new();
    if !task.description.is_empty() {
        body.push_str(&format!("Description: {}\n", task.description));
    }
    body.push_str(&format!("Priority: {}\n", task.priority));
    if !task.category.is_empty() {
        body.push_str(&format!("Category: {}\n", task.category));
    }
    if let Some(time) = task.reminder_time {
        body.push_str(&format!("Time: {}", format_local(&time)));
    }
    body.trim_end().to_string()
}

/// Quotes `text` as an AppleScript string literal.
#[cfg(any(target_os = "macos", test))]
fn applescript_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Sends notifications to the desktop. Uses `notify-send` on Linux and `osascript` on macOS.
pub struct DesktopNotifier;

impl PassiveNotifier for DesktopNotifier {
    fn show(&self, task: &Task, expire_after: Duration) -> Result<()> {
        send(&reminder_title(task), &reminder_body(task), expire_after)
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        // osascript notifications expire on the system's terms.
        fn send(title: &str, body: &str, _expire_after: Duration) -> Result<()> {
            let script = format!(
                "display notification {} with title {}",
                applescript_string(body),
                applescript_string(title),
            );
            tokio::process::Command::new("osascript")
                .arg("-e")
                .arg(script)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;
            Ok(())
        }
    } else if #[cfg(unix)] {
        fn send(title: &str, body: &str, expire_after: Duration) -> Result<()> {
            tokio::process::Command::new("notify-send")
                .arg("--urgency=critical")
                .arg(format!("--expire-time={}", expire_after.as_millis()))
                .arg(format!("--app-name={}", env!("CARGO_PKG_NAME")))
                .arg(title)
                .arg(body)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;
            Ok(())
        }
    } else {
        fn send(_title: &str, _body: &str, _expire_after: Duration) -> Result<()> {
            anyhow::bail!("Desktop notifications aren't supported on this platform")
        }
    }
}
