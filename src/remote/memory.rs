//! In-process gateway.
//!
//! Holds the two tables in memory behind a shared handle, so a test can keep
//! one clone to inspect "remote" state while the coordinator owns another.
//! Failures can be injected per call or for every call.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    CategoryRow, CategoryRowPatch, GatewayError, GatewayResult, RemoteGateway, TaskRow,
    TaskRowPatch,
};

#[derive(Debug, Default)]
struct Tables {
    tasks: Vec<TaskRow>,
    categories: Vec<CategoryRow>,
    fail_next: usize,
    fail_all: Option<GatewayError>,
    calls: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` calls with a network error
    pub fn fail_next(&self, count: usize) {
        self.lock().fail_next = count;
    }

    /// Fail every call with `error` until cleared with `None`
    pub fn fail_all(&self, error: Option<GatewayError>) {
        self.lock().fail_all = error;
    }

    /// Number of calls made, including failed ones
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    /// Seed a row directly, bypassing failure injection
    pub fn seed_task(&self, row: TaskRow) {
        self.lock().tasks.push(row);
    }

    pub fn seed_category(&self, row: CategoryRow) {
        self.lock().categories.push(row);
    }

    pub fn task_rows(&self) -> Vec<TaskRow> {
        self.lock().tasks.clone()
    }

    pub fn category_rows(&self) -> Vec<CategoryRow> {
        self.lock().categories.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panicked test thread must not wedge the others
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn call<T>(&self, op: impl FnOnce(&mut Tables) -> GatewayResult<T>) -> GatewayResult<T> {
        let mut tables = self.lock();
        tables.calls += 1;
        if let Some(err) = tables.fail_all.clone() {
            return Err(err);
        }
        if tables.fail_next > 0 {
            tables.fail_next -= 1;
            return Err(GatewayError::Network("injected failure".to_string()));
        }
        op(&mut *tables)
    }
}

fn conflict(id: &str) -> GatewayError {
    GatewayError::Server {
        status: 409,
        message: format!("duplicate key value: {id}"),
    }
}

impl RemoteGateway for MemoryGateway {
    fn select_tasks(&self, owner_id: &str) -> GatewayResult<Vec<TaskRow>> {
        self.call(|tables| {
            let mut rows: Vec<TaskRow> = tables
                .tasks
                .iter()
                .filter(|row| row.user_id == owner_id)
                .cloned()
                .collect();
            rows.sort_by_key(|row| row.order);
            Ok(rows)
        })
    }

    fn select_categories(&self, owner_id: &str) -> GatewayResult<Vec<CategoryRow>> {
        self.call(|tables| {
            Ok(tables
                .categories
                .iter()
                .filter(|row| row.user_id == owner_id)
                .cloned()
                .collect())
        })
    }

    fn insert_task(&self, row: &TaskRow) -> GatewayResult<()> {
        self.call(|tables| {
            if tables.tasks.iter().any(|existing| existing.id == row.id) {
                return Err(conflict(&row.id));
            }
            tables.tasks.push(row.clone());
            Ok(())
        })
    }

    fn update_task(&self, id: &str, patch: &TaskRowPatch) -> GatewayResult<()> {
        self.call(|tables| {
            // Zero matched rows is not an error, same as the hosted store
            for row in tables.tasks.iter_mut().filter(|row| row.id == id) {
                patch.apply(row);
            }
            Ok(())
        })
    }

    fn delete_task(&self, id: &str) -> GatewayResult<()> {
        self.call(|tables| {
            tables.tasks.retain(|row| row.id != id);
            Ok(())
        })
    }

    fn clear_category(&self, category_id: &str) -> GatewayResult<()> {
        self.call(|tables| {
            for row in tables
                .tasks
                .iter_mut()
                .filter(|row| row.category_id.as_deref() == Some(category_id))
            {
                row.category_id = None;
            }
            Ok(())
        })
    }

    fn insert_category(&self, row: &CategoryRow) -> GatewayResult<()> {
        self.call(|tables| {
            if tables.categories.iter().any(|existing| existing.id == row.id) {
                return Err(conflict(&row.id));
            }
            tables.categories.push(row.clone());
            Ok(())
        })
    }

    fn update_category(&self, id: &str, patch: &CategoryRowPatch) -> GatewayResult<()> {
        self.call(|tables| {
            for row in tables.categories.iter_mut().filter(|row| row.id == id) {
                patch.apply(row);
            }
            Ok(())
        })
    }

    fn delete_category(&self, id: &str) -> GatewayResult<()> {
        self.call(|tables| {
            tables.categories.retain(|row| row.id != id);
            Ok(())
        })
    }
}
