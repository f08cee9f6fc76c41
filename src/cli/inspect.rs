use std::{fmt::Display, path::PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};

use crate::{
    provider::{file::JsonFileProvider, TaskSetProvider},
    reminder::{countdown::next_reminder, evaluator::ReminderEvaluator},
    utils::time::format_remaining,
};

use super::{output::render_task_line, Args};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct CheckCommand {
    #[arg(long, help = "JSON file with tasks. Defaults to tasks.json in the application directory")]
    pub tasks: Option<PathBuf>,
    #[arg(
        long,
        help = "Moment to check. Examples are \"tomorrow\", \"1 hour ago\", \"18:00\", \"12:00 16/03/2025\". Defaults to now"
    )]
    at: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

/// Resolves the moment `check` looks at.
fn parse_moment(at: Option<String>, date_style: DateStyle, now: DateTime<Local>) -> Result<DateTime<Utc>> {
    match at.map(|s| parse_date_string(&s, now, date_style.into())) {
        Some(Ok(v)) => Ok(v.with_timezone(&Utc)),
        Some(Err(e)) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate moment {e}"),
            )
            .into()),
        None => Ok(now.with_timezone(&Utc)),
    }
}

/// Lists reminders that would fire at the requested moment if nothing had been notified yet.
pub async fn process_check_command(
    tasks_path: PathBuf,
    CheckCommand { at, date_style, .. }: CheckCommand,
) -> Result<()> {
    let moment = parse_moment(at, date_style, Local::now())?;
    let tasks = JsonFileProvider::new(tasks_path).current_tasks().await?;

    let mut evaluator = ReminderEvaluator::default();
    let due = evaluator.evaluate_tasks(&tasks, moment);
    if due.is_empty() {
        println!("No reminders due");
    }
    for task in due {
        println!("{}", render_task_line(task));
    }
    Ok(())
}

pub async fn process_next_command(tasks_path: PathBuf) -> Result<()> {
    let tasks = JsonFileProvider::new(tasks_path).current_tasks().await?;
    match next_reminder(&tasks, Utc::now()) {
        Some((task, remaining)) => {
            println!("{}\tin {}", render_task_line(task), format_remaining(remaining));
        }
        None => println!("No upcoming reminders"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Local, TimeZone, Utc};

    use super::{parse_moment, DateStyle};

    #[test]
    fn test_parse_moment() {
        let now = Local.with_ymd_and_hms(2025, 3, 16, 10, 0, 0).unwrap();

        assert_eq!(
            parse_moment(None, DateStyle::Uk, now).unwrap(),
            now.with_timezone(&Utc)
        );
        assert_eq!(
            parse_moment(Some("1 hour ago".into()), DateStyle::Uk, now).unwrap(),
            (now - Duration::hours(1)).with_timezone(&Utc)
        );
        assert!(parse_moment(Some("whenever".into()), DateStyle::Uk, now).is_err());
    }
}
