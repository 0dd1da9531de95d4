//! Dashboard summary and contribution calendar.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::metrics::{completion_rate, percent};
use crate::model::{Priority, Task, TaskStatus};

/// Days covered by the contribution calendar, today included
pub const CALENDAR_DAYS: i64 = 365;

const RECENT_LIMIT: usize = 5;

/// Highlighted window of the contribution calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CalendarRange {
    #[default]
    #[serde(rename = "30")]
    Month,
    #[serde(rename = "90")]
    Quarter,
    #[serde(rename = "180")]
    HalfYear,
    #[serde(rename = "365")]
    Year,
}

impl CalendarRange {
    pub fn days(&self) -> i64 {
        match self {
            CalendarRange::Month => 30,
            CalendarRange::Quarter => 90,
            CalendarRange::HalfYear => 180,
            CalendarRange::Year => 365,
        }
    }
}

impl FromStr for CalendarRange {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "30" => Ok(CalendarRange::Month),
            "90" => Ok(CalendarRange::Quarter),
            "180" => Ok(CalendarRange::HalfYear),
            "365" => Ok(CalendarRange::Year),
            other => Err(Error::InvalidArgument(format!(
                "unknown range '{other}' (expected 30|90|180|365)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// Tasks created that day
    pub count: u32,
    /// Shade 0-4
    pub level: u8,
    pub in_range: bool,
}

/// Shade for `count` relative to the busiest day
pub fn calendar_level(count: u32, max_count: u32) -> u8 {
    if count == 0 {
        return 0;
    }
    if max_count <= 4 {
        return count.min(4) as u8;
    }
    let step = f64::from(max_count) / 4.0;
    (f64::from(count) / step).ceil().min(4.0) as u8
}

/// One entry per day for the last year, oldest first
pub fn contribution_calendar<Tz: TimeZone>(
    tasks: &[Task],
    today: NaiveDate,
    tz: &Tz,
    range: CalendarRange,
) -> Vec<CalendarDay> {
    let start = today - Duration::days(CALENDAR_DAYS - 1);
    let range_start = today - Duration::days(range.days() - 1);

    let mut counts: HashMap<NaiveDate, u32> = HashMap::new();
    for task in tasks {
        let created = task.created_at.with_timezone(tz).date_naive();
        if created >= start && created <= today {
            *counts.entry(created).or_default() += 1;
        }
    }
    let max_count = counts.values().copied().max().unwrap_or(0).max(1);

    start
        .iter_days()
        .take_while(|date| *date <= today)
        .map(|date| {
            let count = counts.get(&date).copied().unwrap_or(0);
            CalendarDay {
                date,
                count,
                level: calendar_level(count, max_count),
                in_range: date >= range_start,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Open task whose due date has passed
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    !task.is_completed() && task.due_date.is_some_and(|due| due < now)
}

/// Open task due on today's local date
pub fn is_due_today<Tz: TimeZone>(task: &Task, today: NaiveDate, tz: &Tz) -> bool {
    !task.is_completed()
        && task
            .due_date
            .is_some_and(|due| due.with_timezone(tz).date_naive() == today)
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total: usize,
    pub status: StatusCounts,
    pub priority: PriorityCounts,
    pub overdue: usize,
    pub due_today: usize,
    pub completion_percent: u32,
    pub recent: Vec<Task>,
    /// Open tasks that are overdue or due today
    pub review: Vec<Task>,
    pub calendar: Vec<CalendarDay>,
}

impl Dashboard {
    pub fn compute<Tz: TimeZone>(
        tasks: &[Task],
        now: DateTime<Utc>,
        tz: &Tz,
        range: CalendarRange,
    ) -> Self {
        let today = now.with_timezone(tz).date_naive();

        let mut status = StatusCounts::default();
        let mut priority = PriorityCounts::default();
        for task in tasks {
            match task.status {
                TaskStatus::Pending => status.pending += 1,
                TaskStatus::InProgress => status.in_progress += 1,
                TaskStatus::Completed => status.completed += 1,
            }
            match task.priority {
                Priority::High => priority.high += 1,
                Priority::Medium => priority.medium += 1,
                Priority::Low => priority.low += 1,
            }
        }

        let mut recent: Vec<&Task> = tasks.iter().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let recent = recent.into_iter().take(RECENT_LIMIT).cloned().collect();

        let review = tasks
            .iter()
            .filter(|task| is_overdue(task, now) || is_due_today(task, today, tz))
            .cloned()
            .collect();

        Self {
            total: tasks.len(),
            status,
            priority,
            overdue: tasks.iter().filter(|task| is_overdue(task, now)).count(),
            due_today: tasks
                .iter()
                .filter(|task| is_due_today(task, today, tz))
                .count(),
            completion_percent: percent(completion_rate(tasks)),
            recent,
            review,
            calendar: contribution_calendar(tasks, today, tz, range),
        }
    }
}
