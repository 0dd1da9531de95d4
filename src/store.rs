//! Local store for taskflow
//!
//! Holds the task and category collections in memory and writes them through
//! to durable storage on every mutation. Storage is a set of keyed text blobs
//! under an application namespace:
//!
//! ```text
//! <data_dir>/
//!   <ns>-tasks.json         # serialized task array
//!   <ns>-categories.json    # serialized category array
//!   <ns>-last-sync.json     # timestamp of the last full refresh
//!   <ns>-session.json       # signed-in owner (see `session`)
//! ```
//!
//! Reads never fail: a missing or corrupt blob loads as an empty collection.
//! Single-collection writes are not rolled back: if persisting fails the
//! in-memory state keeps the mutation and diverges from disk until the next
//! successful write. [`LocalStore::replace_all`] is all or nothing.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT};
use crate::model::{Category, Task};

/// Default storage namespace
pub const DEFAULT_NAMESPACE: &str = "taskflow";

const TASKS_KEY: &str = "tasks";
const CATEGORIES_KEY: &str = "categories";
const LAST_SYNC_KEY: &str = "last-sync";

/// Keyed blob persistence behind the local store
pub trait StorageBackend {
    /// Read a blob, `Ok(None)` when absent
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace a blob
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a blob if present
    fn delete(&self, key: &str) -> Result<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        (**self).write(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

/// One JSON file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    lock_timeout: Duration,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        lock::read_blob(&self.path_for(key), self.lock_timeout)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        lock::write_blob(&self.path_for(key), value, self.lock_timeout)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }
}

/// In-process blobs, shareable between handles
///
/// `fail_writes` makes every write return an IO error, which is how tests
/// reach the "durable write failed" path. `reject_writes_to` fails only the
/// keys ending in a suffix.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    blobs: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<Mutex<bool>>,
    rejected_suffix: Arc<Mutex<Option<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    pub fn reject_writes_to(&self, suffix: Option<&str>) {
        if let Ok(mut rejected) = self.rejected_suffix.lock() {
            *rejected = suffix.map(str::to_string);
        }
    }

    /// Raw blob contents, for tests
    pub fn raw(&self, key: &str) -> Option<String> {
        self.blobs.lock().ok()?.get(key).cloned()
    }

    /// Seed a raw blob, for tests
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(key.to_string(), value.to_string());
        }
    }

    fn poisoned() -> Error {
        Error::Io(std::io::Error::other("memory backend lock poisoned"))
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let blobs = self.blobs.lock().map_err(|_| Self::poisoned())?;
        Ok(blobs.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let failing = self.fail_writes.lock().map(|flag| *flag).unwrap_or(false);
        let rejected = self
            .rejected_suffix
            .lock()
            .map(|suffix| suffix.as_deref().is_some_and(|suffix| key.ends_with(suffix)))
            .unwrap_or(false);
        if failing || rejected {
            return Err(Error::Io(std::io::Error::other(format!(
                "write to '{key}' rejected"
            ))));
        }
        let mut blobs = self.blobs.lock().map_err(|_| Self::poisoned())?;
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut blobs = self.blobs.lock().map_err(|_| Self::poisoned())?;
        blobs.remove(key);
        Ok(())
    }
}

/// Namespaced key for a blob, e.g. `taskflow-tasks`
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{namespace}-{key}")
}

/// In-memory task and category collections with write-through persistence
pub struct LocalStore<B: StorageBackend> {
    backend: B,
    namespace: String,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    last_sync: Option<DateTime<Utc>>,
}

impl<B: StorageBackend> LocalStore<B> {
    /// Restore collections from the backend
    ///
    /// Never fails: absent or unreadable blobs become empty collections.
    pub fn load(backend: B, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let tasks: Vec<Task> = read_blob(&backend, &namespaced_key(&namespace, TASKS_KEY));
        let categories: Vec<Category> =
            read_blob(&backend, &namespaced_key(&namespace, CATEGORIES_KEY));
        let last_sync: Option<DateTime<Utc>> =
            read_blob(&backend, &namespaced_key(&namespace, LAST_SYNC_KEY));

        tracing::debug!(
            namespace = %namespace,
            tasks = tasks.len(),
            categories = categories.len(),
            "local store loaded"
        );

        let mut store = Self {
            backend,
            namespace,
            tasks,
            categories,
            last_sync,
        };
        store.sort_tasks();
        store
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Tasks in `order` sequence
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Replace both collections with a fetched snapshot
    ///
    /// Nothing is merged. Every blob is written before memory is swapped; if
    /// one write fails the blobs already written are restored and both memory
    /// and disk keep the previous state.
    pub fn replace_all(
        &mut self,
        mut tasks: Vec<Task>,
        categories: Vec<Category>,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        tasks.sort_by_key(|task| task.order);
        let last_sync = Some(synced_at);
        let blobs = [
            (TASKS_KEY, serde_json::to_string(&tasks)?),
            (CATEGORIES_KEY, serde_json::to_string(&categories)?),
            (LAST_SYNC_KEY, serde_json::to_string(&last_sync)?),
        ];
        self.write_all_or_restore(&blobs)?;

        self.tasks = tasks;
        self.categories = categories;
        self.last_sync = last_sync;
        Ok(())
    }

    /// Insert or replace a task by id, then persist all tasks
    pub fn upsert_task(&mut self, task: Task) -> Result<()> {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
        self.sort_tasks();
        self.persist_tasks()
    }

    /// Replace the whole task collection, then persist
    pub fn set_tasks(&mut self, tasks: Vec<Task>) -> Result<()> {
        self.tasks = tasks;
        self.sort_tasks();
        self.persist_tasks()
    }

    /// Remove a task; returns it if it existed
    pub fn remove_task(&mut self, id: &str) -> Result<Option<Task>> {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            return Ok(None);
        };
        let removed = self.tasks.remove(index);
        self.persist_tasks()?;
        Ok(Some(removed))
    }

    /// Insert or replace a category by id, then persist all categories
    pub fn upsert_category(&mut self, category: Category) -> Result<()> {
        match self
            .categories
            .iter_mut()
            .find(|existing| existing.id == category.id)
        {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
        self.persist_categories()
    }

    /// Remove a category; returns it if it existed
    pub fn remove_category(&mut self, id: &str) -> Result<Option<Category>> {
        let Some(index) = self.categories.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let removed = self.categories.remove(index);
        self.persist_categories()?;
        Ok(Some(removed))
    }

    fn sort_tasks(&mut self) {
        self.tasks.sort_by_key(|task| task.order);
    }

    fn persist_tasks(&self) -> Result<()> {
        self.write_blob(TASKS_KEY, &self.tasks)
    }

    fn persist_categories(&self) -> Result<()> {
        self.write_blob(CATEGORIES_KEY, &self.categories)
    }

    fn write_all_or_restore(&self, blobs: &[(&str, String)]) -> Result<()> {
        let mut pending = Vec::with_capacity(blobs.len());
        for (key, json) in blobs {
            let key = namespaced_key(&self.namespace, key);
            let previous = self.backend.read(&key)?;
            pending.push((key, json, previous));
        }

        let mut written = Vec::with_capacity(pending.len());
        for (key, json, previous) in pending {
            if let Err(err) = self.backend.write(&key, json) {
                tracing::warn!(key = %key, error = %err, "snapshot write failed, restoring");
                self.restore(written);
                return Err(err);
            }
            written.push((key, previous));
        }
        Ok(())
    }

    fn restore(&self, written: Vec<(String, Option<String>)>) {
        for (key, previous) in written.into_iter().rev() {
            let restored = match previous {
                Some(raw) => self.backend.write(&key, &raw),
                None => self.backend.delete(&key),
            };
            if let Err(err) = restored {
                tracing::error!(key = %key, error = %err, "could not restore blob");
            }
        }
    }

    fn write_blob<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let key = namespaced_key(&self.namespace, key);
        let json = serde_json::to_string(value)?;
        tracing::debug!(key = %key, bytes = json.len(), "persisting blob");
        self.backend.write(&key, &json)
    }
}

fn read_blob<B: StorageBackend, T: DeserializeOwned + Default>(backend: &B, key: &str) -> T {
    let raw = match backend.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(err) => {
            tracing::warn!(key = %key, error = %err, "unreadable blob, treating as empty");
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key = %key, error = %err, "corrupt blob, treating as empty");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;
    use chrono::TimeZone;

    fn task_at(title: &str, order: u32) -> Task {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut task = NewTask::titled(title).into_task(now);
        task.order = order;
        task
    }

    #[test]
    fn load_from_empty_backend_is_empty() {
        let store = LocalStore::load(MemoryBackend::new(), DEFAULT_NAMESPACE);
        assert!(store.tasks().is_empty());
        assert!(store.categories().is_empty());
        assert!(store.last_sync().is_none());
    }

    #[test]
    fn corrupt_blob_loads_as_empty() {
        let backend = MemoryBackend::new();
        backend.insert_raw("taskflow-tasks", "{not json");
        backend.insert_raw("taskflow-categories", "[]");

        let store = LocalStore::load(backend, DEFAULT_NAMESPACE);
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn upsert_writes_through_under_namespace() {
        let backend = MemoryBackend::new();
        let mut store = LocalStore::load(backend.clone(), "work");
        store.upsert_task(task_at("one", 0)).unwrap();

        let raw = backend.raw("work-tasks").expect("tasks blob");
        let persisted: Vec<Task> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].title, "one");
        assert!(backend.raw("taskflow-tasks").is_none());
    }

    #[test]
    fn failed_write_keeps_memory_state() {
        let backend = MemoryBackend::new();
        let mut store = LocalStore::load(backend.clone(), DEFAULT_NAMESPACE);
        backend.set_fail_writes(true);

        assert!(store.upsert_task(task_at("unsaved", 0)).is_err());
        assert_eq!(store.tasks().len(), 1);
        assert!(backend.raw("taskflow-tasks").is_none());
    }

    #[test]
    fn tasks_are_kept_in_order_sequence() {
        let mut store = LocalStore::load(MemoryBackend::new(), DEFAULT_NAMESPACE);
        store.upsert_task(task_at("second", 1)).unwrap();
        store.upsert_task(task_at("first", 0)).unwrap();

        let titles: Vec<_> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["first", "second"]);
    }

    #[test]
    fn replace_all_overwrites_and_stamps_sync() {
        let backend = MemoryBackend::new();
        let mut store = LocalStore::load(backend.clone(), DEFAULT_NAMESPACE);
        store.upsert_task(task_at("local only", 0)).unwrap();

        let synced_at = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
        store
            .replace_all(vec![task_at("remote", 0)], Vec::new(), synced_at)
            .unwrap();

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].title, "remote");
        assert_eq!(store.last_sync(), Some(synced_at));

        let reloaded = LocalStore::load(backend, DEFAULT_NAMESPACE);
        assert_eq!(reloaded.tasks()[0].title, "remote");
        assert_eq!(reloaded.last_sync(), Some(synced_at));
    }

    #[test]
    fn failed_snapshot_write_keeps_previous_state() {
        let backend = MemoryBackend::new();
        let mut store = LocalStore::load(backend.clone(), DEFAULT_NAMESPACE);
        store.upsert_task(task_at("local", 0)).unwrap();
        let before = backend.raw("taskflow-tasks");

        backend.reject_writes_to(Some("-categories"));
        let synced_at = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
        assert!(store
            .replace_all(vec![task_at("remote", 0)], Vec::new(), synced_at)
            .is_err());

        assert_eq!(store.tasks()[0].title, "local");
        assert!(store.last_sync().is_none());
        assert_eq!(backend.raw("taskflow-tasks"), before);
        assert!(backend.raw("taskflow-last-sync").is_none());
    }

    #[test]
    fn file_backend_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let mut store = LocalStore::load(backend.clone(), DEFAULT_NAMESPACE);
        store.upsert_task(task_at("on disk", 0)).unwrap();

        assert!(backend.path_for("taskflow-tasks").exists());
        let reloaded = LocalStore::load(backend, DEFAULT_NAMESPACE);
        assert_eq!(reloaded.tasks()[0].title, "on disk");
    }
}
