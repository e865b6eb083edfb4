//! `next_run` computation for each [`nanoclaw_core::ScheduleType`]
//! (spec.md §4.F step 4).

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use nanoclaw_core::{ScheduleType, Task, TaskStatus};

use crate::error::SchedulerError;

/// Compute the next fire time for `task` after `from`, given its
/// `schedule_type`/`schedule_value`, and the configured scheduler
/// timezone (used only for `Cron`).
///
/// Returns `None` for `Once` - callers should set `status = Completed`
/// instead of rescheduling.
pub fn next_run_after(
    task: &Task,
    from: DateTime<Utc>,
    timezone: &str,
) -> Result<Option<DateTime<Utc>>, SchedulerError> {
    match task.schedule_type {
        ScheduleType::Once => Ok(None),
        ScheduleType::Interval => {
            let millis: i64 = task.schedule_value.parse().map_err(|_| {
                SchedulerError::InvalidSchedule {
                    task_id: task.task_id.0.clone(),
                    reason: format!("'{}' is not a valid interval in milliseconds", task.schedule_value),
                }
            })?;
            Ok(Some(from + chrono::Duration::milliseconds(millis)))
        }
        ScheduleType::Cron => {
            let tz: chrono_tz::Tz = timezone.parse().map_err(|_| SchedulerError::InvalidSchedule {
                task_id: task.task_id.0.clone(),
                reason: format!("'{timezone}' is not a recognized timezone"),
            })?;
            let schedule = Schedule::from_str(&task.schedule_value).map_err(|err| {
                SchedulerError::InvalidSchedule {
                    task_id: task.task_id.0.clone(),
                    reason: err.to_string(),
                }
            })?;
            let from_tz = from.with_timezone(&tz);
            let next = schedule
                .after(&from_tz)
                .next()
                .ok_or_else(|| SchedulerError::InvalidSchedule {
                    task_id: task.task_id.0.clone(),
                    reason: "cron expression has no future occurrences".to_string(),
                })?;
            Ok(Some(next.with_timezone(&Utc)))
        }
    }
}

/// Apply a successful run to `task`: recompute `next_run`/`status`, clear
/// the retry counter, and set `last_run`.
pub fn apply_success(task: &mut Task, now: DateTime<Utc>, timezone: &str) -> Result<(), SchedulerError> {
    task.last_run = Some(now);
    task.failed_attempts = 0;
    match next_run_after(task, now, timezone)? {
        Some(next) => task.next_run = Some(next),
        None => {
            task.next_run = None;
            task.status = TaskStatus::Completed;
        }
    }
    Ok(())
}

/// Apply a failed run to `task`: bump the retry counter and, past
/// `max_attempts`, move it to the failed sentinel state. `next_run` is
/// left untouched so the same tick keeps retrying while the budget
/// lasts.
pub fn apply_failure(task: &mut Task, max_attempts: u32) {
    task.failed_attempts += 1;
    if task.failed_attempts >= max_attempts {
        task.status = TaskStatus::Failed;
        task.next_run = None;
    }
}
