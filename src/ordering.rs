//! Manual ordering of the task collection.
//!
//! `order` is a dense, collection-wide index: after [`append`], [`reorder`]
//! or a delete followed by [`normalize`] the values are exactly `0..N`.
//! Reindexing is always a full pass; there are no sparse or fractional keys.
//!
//! The alternate views (due date, priority, created, title) live here too.
//! They sort a copy and never touch `order`.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::Task;

/// Stable-sort by `order` and rewrite it as the position.
///
/// Returns the ids whose `order` changed. Repairs gaps or duplicates from
/// data written by older clients.
pub fn normalize(tasks: &mut [Task]) -> Vec<String> {
    tasks.sort_by_key(|task| task.order);
    reindex(tasks)
}

fn reindex(tasks: &mut [Task]) -> Vec<String> {
    let mut changed = Vec::new();
    for (position, task) in tasks.iter_mut().enumerate() {
        let position = position as u32;
        if task.order != position {
            task.order = position;
            changed.push(task.id.clone());
        }
    }
    changed
}

/// Add `task` at the end. Returns ids of pre-existing tasks that were
/// renumbered while normalizing.
pub fn append(tasks: &mut Vec<Task>, mut task: Task) -> Vec<String> {
    let changed = normalize(tasks);
    task.order = tasks.len() as u32;
    tasks.push(task);
    changed
}

/// Move `task_id` to `new_index` in the order sequence and renumber all.
///
/// `new_index` past the end lands on the last slot. Returns `false` when the
/// task is already there (nothing is rewritten).
pub fn reorder(tasks: &mut Vec<Task>, task_id: &str, new_index: usize) -> Result<bool> {
    normalize(tasks);
    let current = tasks
        .iter()
        .position(|task| task.id == task_id)
        .ok_or_else(|| Error::task_not_found(task_id))?;

    let target = new_index.min(tasks.len() - 1);
    if current == target {
        return Ok(false);
    }

    let task = tasks.remove(current);
    tasks.insert(target, task);
    reindex(tasks);
    Ok(true)
}

/// True when `order` values are exactly `0..N` once each
pub fn is_dense(tasks: &[Task]) -> bool {
    let mut seen = vec![false; tasks.len()];
    for task in tasks {
        let Some(slot) = seen.get_mut(task.order as usize) else {
            return false;
        };
        if *slot {
            return false;
        }
        *slot = true;
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Order,
    DueDate,
    Priority,
    CreatedAt,
    Title,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "order" | "manual" => Ok(SortKey::Order),
            "due_date" | "due" => Ok(SortKey::DueDate),
            "priority" => Ok(SortKey::Priority),
            "created_at" | "created" => Ok(SortKey::CreatedAt),
            "title" => Ok(SortKey::Title),
            other => Err(Error::InvalidArgument(format!(
                "unknown sort key '{other}' (expected order|due_date|priority|created_at|title)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

fn compare(key: SortKey, left: &Task, right: &Task) -> Ordering {
    match key {
        SortKey::Order => left.order.cmp(&right.order),
        // Undated tasks first when ascending
        SortKey::DueDate => left.due_date.cmp(&right.due_date),
        SortKey::Priority => left.priority.rank().cmp(&right.priority.rank()),
        SortKey::CreatedAt => left.created_at.cmp(&right.created_at),
        SortKey::Title => left.title.to_lowercase().cmp(&right.title.to_lowercase()),
    }
}

/// Sort a view. Equal keys have no secondary tie-break.
pub fn sort_view(tasks: &mut [&Task], key: SortKey, direction: SortDirection) {
    tasks.sort_unstable_by(|left, right| {
        let ordering = compare(key, left, right);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}
