//! Reminders for a task list. A small engine polls the current tasks, fires each reminder at
//! most once when it comes due and keeps an independently stoppable alert per task.
//! It can run as a background daemon or be watched from a terminal.
//!

pub mod cli;
pub mod daemon;
pub mod provider;
pub mod reminder;
pub mod utils;
