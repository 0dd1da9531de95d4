//! Filtered, sorted views over the task collection.

use serde::Serialize;

use crate::model::{Priority, Task, TaskStatus};
use crate::ordering::{self, SortDirection, SortKey};

/// Filter and sort options for listing tasks
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskQuery {
    /// Case-insensitive substring over title and description
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub category_id: Option<String>,
    pub priority: Option<Priority>,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl TaskQuery {
    /// Apply search, status, category and priority filters, then sort
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
            .map(str::to_lowercase);

        let mut view: Vec<&Task> = tasks
            .iter()
            .filter(|task| match &needle {
                Some(needle) => matches_search(task, needle),
                None => true,
            })
            .filter(|task| self.status.map_or(true, |status| task.status == status))
            .filter(|task| {
                self.category_id
                    .as_deref()
                    .map_or(true, |id| task.category_id.as_deref() == Some(id))
            })
            .filter(|task| self.priority.map_or(true, |p| task.priority == p))
            .collect();

        ordering::sort_view(&mut view, self.sort, self.direction);
        view
    }
}

fn matches_search(task: &Task, needle: &str) -> bool {
    if task.title.to_lowercase().contains(needle) {
        return true;
    }
    task.description
        .as_deref()
        .is_some_and(|description| description.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;
    use chrono::{TimeZone, Utc};

    fn sample() -> Vec<Task> {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let mut write = NewTask::titled("Write report").into_task(now);
        write.description = Some("Quarterly NUMBERS".to_string());
        write.priority = Priority::High;
        write.category_id = Some("work".to_string());
        write.order = 0;

        let mut shop = NewTask::titled("Shopping").into_task(now);
        shop.status = TaskStatus::Completed;
        shop.priority = Priority::Low;
        shop.order = 1;

        let mut call = NewTask::titled("Call plumber").into_task(now);
        call.category_id = Some("home".to_string());
        call.order = 2;

        vec![write, shop, call]
    }

    #[test]
    fn default_query_keeps_manual_order() {
        let tasks = sample();
        let view = TaskQuery::default().apply(&tasks);
        let titles: Vec<_> = view.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["Write report", "Shopping", "Call plumber"]);
    }

    #[test]
    fn search_covers_description_case_insensitively() {
        let tasks = sample();
        let query = TaskQuery {
            search: Some("numbers".to_string()),
            ..TaskQuery::default()
        };
        let view = query.apply(&tasks);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].title, "Write report");
    }

    #[test]
    fn blank_search_matches_everything() {
        let tasks = sample();
        let query = TaskQuery {
            search: Some("  ".to_string()),
            ..TaskQuery::default()
        };
        assert_eq!(query.apply(&tasks).len(), 3);
    }

    #[test]
    fn filters_compose() {
        let tasks = sample();
        let query = TaskQuery {
            status: Some(TaskStatus::Pending),
            category_id: Some("home".to_string()),
            ..TaskQuery::default()
        };
        let view = query.apply(&tasks);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].title, "Call plumber");

        let query = TaskQuery {
            priority: Some(Priority::Low),
            ..TaskQuery::default()
        };
        assert_eq!(query.apply(&tasks)[0].title, "Shopping");
    }

    #[test]
    fn title_sort_descending() {
        let tasks = sample();
        let query = TaskQuery {
            sort: SortKey::Title,
            direction: SortDirection::Desc,
            ..TaskQuery::default()
        };
        let view = query.apply(&tasks);
        assert_eq!(view[0].title, "Write report");
        assert_eq!(view[2].title, "Call plumber");
    }
}
