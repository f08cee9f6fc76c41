use ansi_term::{Colour, Style};

use crate::{
    reminder::{
        notifier::reminder_body,
        task::{Priority, Task},
    },
    utils::time::format_local,
};

fn priority_colour(priority: Priority) -> Colour {
    match priority {
        Priority::High => Colour::Red,
        Priority::Medium => Colour::Yellow,
        Priority::Low => Colour::Green,
    }
}

/// The terminal version of the reminder popup.
pub fn render_reminder(task: &Task) -> String {
    let header = Colour::Yellow.bold().paint("⏰ TASK REMINDER ⏰");
    let title = Style::new().bold().paint(format!("Task: {}", task.title));
    let hint = Colour::Fixed(244).paint(format!(
        "Enter to acknowledge, \"s {}\" to stop the sound, \"all\" to acknowledge everything",
        task.id
    ));
    format!("{header}\n{title}\n{}\n{hint}", reminder_body(task))
}

/// One line per task, as printed by `check` and `next`.
pub fn render_task_line(task: &Task) -> String {
    let priority = priority_colour(task.priority).paint(task.priority.to_string());
    let time = task
        .reminder_time
        .map(|v| format_local(&v))
        .unwrap_or_else(|| "-".into());
    format!("{time}\t{priority}\t{}\t{}", task.id, task.title)
}
