//! Derived task metrics
//!
//! Everything here is a pure function of a task slice. Calendar dates are
//! taken in a caller-supplied time zone, and "today" is passed in rather
//! than read from the clock.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::model::{Task, TaskStatus};

/// Completed / total, 0 for an empty collection
pub fn completion_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks.iter().filter(|task| task.is_completed()).count();
    completed as f64 / tasks.len() as f64
}

/// A completed task counts as on time when its due date is not before its
/// last update. Undated tasks are neither on time nor late.
fn is_on_time(task: &Task) -> bool {
    task.is_completed() && task.due_date.is_some_and(|due| due >= task.updated_at)
}

fn is_completed_late(task: &Task) -> bool {
    task.is_completed() && task.due_date.is_some_and(|due| due < task.updated_at)
}

/// On-time completions / completions, 0 when nothing is completed
pub fn on_time_rate(tasks: &[Task]) -> f64 {
    let completed = tasks.iter().filter(|task| task.is_completed()).count();
    if completed == 0 {
        return 0.0;
    }
    let on_time = tasks.iter().filter(|task| is_on_time(task)).count();
    on_time as f64 / completed as f64
}

/// Completed tasks that were finished after their due date
pub fn overdue_completed(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| is_completed_late(task)).count()
}

/// Local dates on which at least one task was completed
pub fn active_days<Tz: TimeZone>(tasks: &[Task], tz: &Tz) -> BTreeSet<NaiveDate> {
    tasks
        .iter()
        .filter(|task| task.is_completed())
        .map(|task| task.updated_at.with_timezone(tz).date_naive())
        .collect()
}

/// Consecutive-day completion streaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
    pub weeks: u32,
    pub months: u32,
}

/// Current streak runs back from today, or from yesterday when nothing has
/// been completed yet today. Longest is the longest run anywhere.
pub fn streaks<Tz: TimeZone>(tasks: &[Task], today: NaiveDate, tz: &Tz) -> Streaks {
    let days = active_days(tasks, tz);
    let current = current_streak(&days, today);
    Streaks {
        current,
        longest: longest_streak(&days),
        weeks: current / 7,
        months: current / 30,
    }
}

fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let yesterday = today - Duration::days(1);
    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut count = 0;
    while days.contains(&cursor) {
        count += 1;
        cursor -= Duration::days(1);
    }
    count
}

fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for &day in days {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

/// Rate in [0, 1] as a rounded whole percentage
pub fn percent(rate: f64) -> u32 {
    (rate.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Everything the dashboard and achievements read
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskMetrics {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub completion_rate: f64,
    pub on_time_rate: f64,
    pub completed_on_time: usize,
    pub overdue_completed: usize,
    pub active_days: usize,
    pub streaks: Streaks,
}

impl TaskMetrics {
    pub fn compute<Tz: TimeZone>(tasks: &[Task], now: DateTime<Utc>, tz: &Tz) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let today = now.with_timezone(tz).date_naive();
        Self {
            total: tasks.len(),
            pending: count(TaskStatus::Pending),
            in_progress: count(TaskStatus::InProgress),
            completed: count(TaskStatus::Completed),
            completion_rate: completion_rate(tasks),
            on_time_rate: on_time_rate(tasks),
            completed_on_time: tasks.iter().filter(|task| is_on_time(task)).count(),
            overdue_completed: overdue_completed(tasks),
            active_days: active_days(tasks, tz).len(),
            streaks: streaks(tasks, today, tz),
        }
    }
}
