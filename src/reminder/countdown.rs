use chrono::{DateTime, Duration, Utc};

use super::task::Task;

/// The armed reminder that comes up next, together with the time left until it fires.
pub fn next_reminder(tasks: &[Task], now: DateTime<Utc>) -> Option<(&Task, Duration)> {
    tasks
        .iter()
        .filter(|task| task.is_armed())
        .filter_map(|task| task.reminder_time.map(|time| (task, time)))
        .filter(|(_, time)| *time > now)
        .min_by_key(|(_, time)| *time)
        .map(|(task, time)| (task, time - now))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::reminder::task::{Task, TaskStatus};

    use super::next_reminder;

    #[test]
    fn test_picks_earliest_upcoming() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        let tasks = [
            Task::new("past", "task").with_reminder(now - Duration::minutes(1)),
            Task::new("later", "task").with_reminder(now + Duration::hours(2)),
            Task::new("done", "task")
                .with_reminder(now + Duration::minutes(1))
                .with_status(TaskStatus::Completed),
            Task::new("muted", "task")
                .with_reminder(now + Duration::minutes(2))
                .with_notification(false),
            Task::new("next", "task").with_reminder(now + Duration::minutes(30)),
        ];

        let (task, remaining) = next_reminder(&tasks, now).unwrap();
        assert_eq!(&*task.id, "next");
        assert_eq!(remaining, Duration::minutes(30));
    }

    #[test]
    fn test_nothing_upcoming() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        let tasks = [Task::new("past", "task").with_reminder(now)];
        assert!(next_reminder(&tasks, now).is_none());
    }
}
