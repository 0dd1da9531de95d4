//! Achievement levels
//!
//! A track is five ascending thresholds mapped to the five levels. A value
//! sits at the first level whose threshold it has not reached yet, or at
//! master once it meets the last one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::{percent, TaskMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    Master,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Beginner,
        Level::Intermediate,
        Level::Advanced,
        Level::Expert,
        Level::Master,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
            Level::Expert => "expert",
            Level::Master => "master",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds(pub [u32; 5]);

impl Thresholds {
    pub const TASKS_COMPLETED: Thresholds = Thresholds([10, 50, 100, 500, 1000]);
    pub const STREAK: Thresholds = Thresholds([3, 7, 14, 30, 60]);
    pub const ON_TIME_RATE: Thresholds = Thresholds([60, 70, 80, 90, 95]);

    /// Thresholds must be positive and strictly ascending
    pub fn validate(&self, track: &str) -> Result<()> {
        let values = self.0;
        if values[0] == 0 || values.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(Error::InvalidConfig(format!(
                "achievements.{track} must be positive and strictly ascending, got {values:?}"
            )));
        }
        Ok(())
    }

    pub fn level_for(&self, value: u32) -> Level {
        self.0
            .iter()
            .position(|&threshold| threshold > value)
            .map_or(Level::Master, |index| Level::ALL[index])
    }

    /// First threshold above `value`, or the last one once all are met
    pub fn next_threshold(&self, value: u32) -> u32 {
        self.0
            .iter()
            .copied()
            .find(|&threshold| threshold > value)
            .unwrap_or(self.0[4])
    }

    /// Percent of the way to the next threshold, capped at 100
    pub fn progress(&self, value: u32) -> u32 {
        let next = self.next_threshold(value);
        if next == 0 {
            return 100;
        }
        let ratio = (f64::from(value) / f64::from(next) * 100.0).round();
        (ratio as u32).min(100)
    }
}

/// Threshold tables per track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackThresholds {
    #[serde(default = "default_tasks_completed")]
    pub tasks_completed: Thresholds,
    #[serde(default = "default_streak")]
    pub streak: Thresholds,
    #[serde(default = "default_on_time_rate")]
    pub on_time_rate: Thresholds,
}

fn default_tasks_completed() -> Thresholds {
    Thresholds::TASKS_COMPLETED
}

fn default_streak() -> Thresholds {
    Thresholds::STREAK
}

fn default_on_time_rate() -> Thresholds {
    Thresholds::ON_TIME_RATE
}

impl Default for TrackThresholds {
    fn default() -> Self {
        Self {
            tasks_completed: default_tasks_completed(),
            streak: default_streak(),
            on_time_rate: default_on_time_rate(),
        }
    }
}

impl TrackThresholds {
    pub fn validate(&self) -> Result<()> {
        self.tasks_completed.validate("tasks_completed")?;
        self.streak.validate("streak")?;
        self.on_time_rate.validate("on_time_rate")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub value: u32,
    pub level: Level,
    pub next_threshold: u32,
    pub progress: u32,
}

impl Achievement {
    pub fn new(value: u32, thresholds: &Thresholds) -> Self {
        Self {
            value,
            level: thresholds.level_for(value),
            next_threshold: thresholds.next_threshold(value),
            progress: thresholds.progress(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievements {
    pub current_streak: Achievement,
    pub longest_streak: Achievement,
    pub tasks_completed: Achievement,
    pub on_time_rate: Achievement,
    /// Late completions; graded on the tasks-completed track
    pub overdue_managed: Achievement,
}

impl Achievements {
    pub fn compute(metrics: &TaskMetrics, thresholds: &TrackThresholds) -> Self {
        let count = |value: usize| u32::try_from(value).unwrap_or(u32::MAX);
        Self {
            current_streak: Achievement::new(metrics.streaks.current, &thresholds.streak),
            longest_streak: Achievement::new(metrics.streaks.longest, &thresholds.streak),
            tasks_completed: Achievement::new(
                count(metrics.completed),
                &thresholds.tasks_completed,
            ),
            on_time_rate: Achievement::new(
                percent(metrics.on_time_rate),
                &thresholds.on_time_rate,
            ),
            overdue_managed: Achievement::new(
                count(metrics.overdue_completed),
                &thresholds.tasks_completed,
            ),
        }
    }
}
