//! Wire row shapes for the hosted tables.
//!
//! Column names are snake_case and every row carries `user_id`. Patches
//! serialize only the fields they set; a nullable column that is set to
//! `Some(None)` goes out as an explicit `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Category, Priority, Task, TaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order: u32,
}

impl TaskRow {
    pub fn from_task(task: &Task, owner_id: &str) -> Self {
        Self {
            id: task.id.clone(),
            user_id: owner_id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            category_id: task.category_id.clone(),
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
            order: task.order,
        }
    }

    pub fn into_task(self) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            category_id: self.category_id,
            due_date: self.due_date,
            created_at: self.created_at,
            // Rows written by other clients may carry a skewed updated_at
            updated_at: self.updated_at.max(self.created_at),
            order: self.order,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl CategoryRow {
    pub fn from_category(category: &Category, owner_id: &str) -> Self {
        Self {
            id: category.id.clone(),
            user_id: owner_id.to_string(),
            name: category.name.clone(),
            color: category.color.clone(),
            created_at: category.created_at,
        }
    }

    pub fn into_category(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
            color: self.color,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskRowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl TaskRowPatch {
    /// Every mutable column of an edited task
    pub fn full(task: &Task) -> Self {
        Self {
            title: Some(task.title.clone()),
            description: Some(task.description.clone()),
            status: Some(task.status),
            priority: Some(task.priority),
            category_id: Some(task.category_id.clone()),
            due_date: Some(task.due_date),
            updated_at: Some(task.updated_at),
            order: Some(task.order),
        }
    }

    pub fn order(order: u32) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    /// Apply onto a row (used by the in-memory gateway)
    pub fn apply(&self, row: &mut TaskRow) {
        if let Some(title) = &self.title {
            row.title = title.clone();
        }
        if let Some(description) = &self.description {
            row.description = description.clone();
        }
        if let Some(status) = self.status {
            row.status = status;
        }
        if let Some(priority) = self.priority {
            row.priority = priority;
        }
        if let Some(category_id) = &self.category_id {
            row.category_id = category_id.clone();
        }
        if let Some(due_date) = self.due_date {
            row.due_date = due_date;
        }
        if let Some(updated_at) = self.updated_at {
            row.updated_at = updated_at;
        }
        if let Some(order) = self.order {
            row.order = order;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryRowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CategoryRowPatch {
    pub fn full(category: &Category) -> Self {
        Self {
            name: Some(category.name.clone()),
            color: Some(category.color.clone()),
        }
    }

    pub fn apply(&self, row: &mut CategoryRow) {
        if let Some(name) = &self.name {
            row.name = name.clone();
        }
        if let Some(color) = &self.color {
            row.color = color.clone();
        }
    }
}
