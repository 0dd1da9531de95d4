//! Dashboard and achievements commands.

use chrono::{Local, Utc};
use serde::Serialize;

use crate::achievements::{Achievement, Achievements};
use crate::cli::{short_id, Context, GlobalOptions};
use crate::dashboard::{CalendarRange, Dashboard};
use crate::error::Result;
use crate::metrics::{percent, TaskMetrics};
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct AchievementsOutput {
    metrics: TaskMetrics,
    achievements: Achievements,
}

pub fn run_dashboard(global: &GlobalOptions, range: &str, show_calendar: bool) -> Result<()> {
    let range: CalendarRange = range.parse()?;
    let ctx = Context::open(global)?;
    let dashboard = Dashboard::compute(ctx.coordinator.store().tasks(), Utc::now(), &Local, range);

    let mut human = HumanOutput::new("Dashboard");
    human.push_summary("Total", dashboard.total.to_string());
    human.push_summary(
        "Status",
        format!(
            "{} pending, {} in progress, {} completed",
            dashboard.status.pending, dashboard.status.in_progress, dashboard.status.completed
        ),
    );
    human.push_summary(
        "Priority",
        format!(
            "{} high, {} medium, {} low",
            dashboard.priority.high, dashboard.priority.medium, dashboard.priority.low
        ),
    );
    human.push_summary("Completion", format!("{}%", dashboard.completion_percent));
    human.push_summary("Overdue", dashboard.overdue.to_string());
    human.push_summary("Due today", dashboard.due_today.to_string());

    for task in &dashboard.review {
        human.push_detail(format!("review: {} {}", short_id(&task.id), task.title));
    }
    for task in &dashboard.recent {
        human.push_detail(format!("recent: {} {}", short_id(&task.id), task.title));
    }
    let in_range = dashboard.calendar.iter().filter(|day| day.in_range);
    let created: u32 = in_range.clone().map(|day| day.count).sum();
    human.push_detail(format!("created in the last {} days: {created}", range.days()));
    if show_calendar {
        for day in in_range.filter(|day| day.count > 0) {
            human.push_detail(format!("{} {} (level {})", day.date, day.count, day.level));
        }
    }

    emit_success(global.output(), "dashboard", &dashboard, Some(&human))
}

fn achievement_line(name: &str, achievement: &Achievement) -> String {
    format!(
        "{name}: {} ({}, {}% toward {})",
        achievement.value, achievement.level, achievement.progress, achievement.next_threshold
    )
}

pub fn run_achievements(global: &GlobalOptions) -> Result<()> {
    let ctx = Context::open(global)?;
    let metrics = TaskMetrics::compute(ctx.coordinator.store().tasks(), Utc::now(), &Local);
    let achievements = Achievements::compute(&metrics, &ctx.config.achievements);

    let mut human = HumanOutput::new("Achievements");
    human.push_summary("Completed", metrics.completed.to_string());
    human.push_summary(
        "Completion rate",
        format!("{}%", percent(metrics.completion_rate)),
    );
    human.push_summary("On-time rate", format!("{}%", percent(metrics.on_time_rate)));
    human.push_summary(
        "Streak",
        format!(
            "{} days (longest {})",
            metrics.streaks.current, metrics.streaks.longest
        ),
    );
    human.push_detail(achievement_line("current streak", &achievements.current_streak));
    human.push_detail(achievement_line("longest streak", &achievements.longest_streak));
    human.push_detail(achievement_line("tasks completed", &achievements.tasks_completed));
    human.push_detail(achievement_line("on-time rate", &achievements.on_time_rate));
    human.push_detail(achievement_line("overdue managed", &achievements.overdue_managed));

    let output = AchievementsOutput {
        metrics,
        achievements,
    };
    emit_success(global.output(), "achievements", &output, Some(&human))
}
