//! Reconciliation coordinator.
//!
//! Every mutation commits to the local store first and then, when an owner
//! is signed in, issues the matching remote calls. The local commit stands
//! whatever the remote outcome; callers see that outcome in [`Committed`].
//! A full refresh is the only path that pulls remote state, and it replaces
//! the local collections wholesale.

use chrono::Utc;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{
    validate_color, validate_name, validate_title, Category, CategoryPatch, NewCategory, NewTask,
    Task, TaskPatch,
};
use crate::ordering;
use crate::remote::{
    CategoryRow, CategoryRowPatch, GatewayError, GatewayResult, RemoteGateway, TaskRow,
    TaskRowPatch,
};
use crate::session::{self, Session, SessionState};
use crate::store::{LocalStore, StorageBackend};

/// What happened on the remote side of a committed mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    /// No owner signed in or no remote configured; nothing was sent
    Offline,
    Synced,
    /// The first remote call that failed. Later calls were not attempted.
    Failed(GatewayError),
}

impl RemoteStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, RemoteStatus::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteStatus::Offline => "offline",
            RemoteStatus::Synced => "synced",
            RemoteStatus::Failed(_) => "failed",
        }
    }
}

/// A locally committed mutation and its remote outcome
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub remote: RemoteStatus,
}

impl<T> Committed<T> {
    /// Treat a remote failure as an error.
    ///
    /// The local commit is not undone by this.
    pub fn into_result(self) -> Result<T> {
        match self.remote {
            RemoteStatus::Failed(err) => Err(Error::Remote(err)),
            RemoteStatus::Offline | RemoteStatus::Synced => Ok(self.value),
        }
    }
}

/// Outcome of a full refresh
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RefreshReport {
    pub tasks: usize,
    pub categories: usize,
    /// Local tasks that did not exist remotely and were dropped
    pub discarded_tasks: usize,
}

/// A deleted category and the tasks that lost their reference to it
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRemoval {
    pub category: Category,
    pub detached_tasks: Vec<String>,
}

pub struct Coordinator<B: StorageBackend, G: RemoteGateway> {
    store: LocalStore<B>,
    gateway: Option<G>,
    session: Option<Session>,
    state: SessionState,
}

impl<B: StorageBackend, G: RemoteGateway> Coordinator<B, G> {
    /// Wrap a loaded store. A persisted session is resumed without a refresh.
    pub fn new(store: LocalStore<B>, gateway: Option<G>) -> Self {
        let session = session::load_session(store.backend(), store.namespace());
        let state = if session.is_some() {
            SessionState::Synced
        } else {
            SessionState::Unauthenticated
        };
        Self {
            store,
            gateway,
            session,
            state,
        }
    }

    pub fn store(&self) -> &LocalStore<B> {
        &self.store
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    // ---- tasks ----

    pub fn create_task(&mut self, new: NewTask) -> Result<Committed<Task>> {
        validate_title(&new.title)?;
        if let Some(category_id) = &new.category_id {
            self.require_category(category_id)?;
        }

        let mut tasks = self.store.tasks().to_vec();
        let renumbered = ordering::append(&mut tasks, new.into_task(Utc::now()));
        let task = tasks
            .last()
            .cloned()
            .ok_or_else(|| Error::InvalidArgument("task list is empty".to_string()))?;
        self.store.set_tasks(tasks)?;
        tracing::debug!(id = %task.id, order = task.order, "task created");

        let orders = self.orders_of(&renumbered);
        let remote = self.push(|gateway, owner| {
            gateway.insert_task(&TaskRow::from_task(&task, owner))?;
            push_orders(gateway, &orders)
        });
        Ok(Committed {
            value: task,
            remote,
        })
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Committed<Task>> {
        let mut task = self
            .store
            .task(id)
            .cloned()
            .ok_or_else(|| Error::task_not_found(id))?;
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        if let Some(Some(category_id)) = &patch.category_id {
            self.require_category(category_id)?;
        }

        patch.apply(&mut task, Utc::now());
        self.store.upsert_task(task.clone())?;

        let remote =
            self.push(|gateway, _| gateway.update_task(&task.id, &TaskRowPatch::full(&task)));
        Ok(Committed {
            value: task,
            remote,
        })
    }

    /// Delete a task and close the gap it leaves in `order`
    pub fn delete_task(&mut self, id: &str) -> Result<Committed<Task>> {
        let removed = self
            .store
            .remove_task(id)?
            .ok_or_else(|| Error::task_not_found(id))?;

        let mut tasks = self.store.tasks().to_vec();
        let renumbered = ordering::normalize(&mut tasks);
        if !renumbered.is_empty() {
            self.store.set_tasks(tasks)?;
        }
        tracing::debug!(id, renumbered = renumbered.len(), "task deleted");

        let orders = self.orders_of(&renumbered);
        let remote = self.push(|gateway, _| {
            gateway.delete_task(&removed.id)?;
            push_orders(gateway, &orders)
        });
        Ok(Committed {
            value: removed,
            remote,
        })
    }

    /// Move a task to `new_index`. `value` is false when it was already there.
    ///
    /// Every task's `order` is pushed, one call each, in sequence.
    /// `updated_at` is left alone.
    pub fn reorder_task(&mut self, id: &str, new_index: usize) -> Result<Committed<bool>> {
        let mut tasks = self.store.tasks().to_vec();
        if !ordering::reorder(&mut tasks, id, new_index)? {
            return Ok(Committed {
                value: false,
                remote: self.push(|_, _| Ok(())),
            });
        }
        self.store.set_tasks(tasks)?;

        let orders: Vec<(String, u32)> = self
            .store
            .tasks()
            .iter()
            .map(|task| (task.id.clone(), task.order))
            .collect();
        let remote = self.push(|gateway, _| push_orders(gateway, &orders));
        Ok(Committed {
            value: true,
            remote,
        })
    }

    // ---- categories ----

    pub fn create_category(&mut self, new: NewCategory) -> Result<Committed<Category>> {
        validate_name(&new.name)?;
        validate_color(&new.color)?;

        let category = new.into_category(Utc::now());
        self.store.upsert_category(category.clone())?;

        let remote = self.push(|gateway, owner| {
            gateway.insert_category(&CategoryRow::from_category(&category, owner))
        });
        Ok(Committed {
            value: category,
            remote,
        })
    }

    pub fn update_category(
        &mut self,
        id: &str,
        patch: CategoryPatch,
    ) -> Result<Committed<Category>> {
        let mut category = self
            .store
            .category(id)
            .cloned()
            .ok_or_else(|| Error::category_not_found(id))?;
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(color) = &patch.color {
            validate_color(color)?;
        }

        patch.apply(&mut category);
        self.store.upsert_category(category.clone())?;

        let remote = self.push(|gateway, _| {
            gateway.update_category(&category.id, &CategoryRowPatch::full(&category))
        });
        Ok(Committed {
            value: category,
            remote,
        })
    }

    /// Delete a category, nulling it out on every task that referenced it
    pub fn delete_category(&mut self, id: &str) -> Result<Committed<CategoryRemoval>> {
        self.require_category(id)?;

        let mut tasks = self.store.tasks().to_vec();
        let mut detached_tasks = Vec::new();
        for task in tasks.iter_mut() {
            if task.category_id.as_deref() == Some(id) {
                task.category_id = None;
                detached_tasks.push(task.id.clone());
            }
        }
        // Tasks are detached before the category goes, so a failed second
        // write leaves an unused category rather than dangling references
        if !detached_tasks.is_empty() {
            self.store.set_tasks(tasks)?;
        }
        let category = self
            .store
            .remove_category(id)?
            .ok_or_else(|| Error::category_not_found(id))?;
        tracing::debug!(id, detached = detached_tasks.len(), "category deleted");

        let remote = self.push(|gateway, _| {
            gateway.clear_category(id)?;
            gateway.delete_category(id)
        });
        Ok(Committed {
            value: CategoryRemoval {
                category,
                detached_tasks,
            },
            remote,
        })
    }

    // ---- session ----

    /// Sign `owner_id` in and pull their data.
    ///
    /// The session is persisted before the refresh, so a failed refresh
    /// still leaves the owner signed in (in [`SessionState::Stale`]).
    pub fn sign_in(&mut self, owner_id: &str, access_token: &str) -> Result<RefreshReport> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(Error::InvalidArgument("owner id cannot be empty".to_string()));
        }
        if access_token.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "access token cannot be empty".to_string(),
            ));
        }
        if self.gateway.is_none() {
            return Err(Error::InvalidConfig(
                "remote store is not configured (set remote.url and remote.api_key)".to_string(),
            ));
        }

        self.state = SessionState::Authenticating;
        let session = Session {
            owner_id: owner_id.to_string(),
            access_token: access_token.to_string(),
            signed_in_at: Utc::now(),
        };
        if let Err(err) =
            session::save_session(self.store.backend(), self.store.namespace(), &session)
        {
            self.state = SessionState::Unauthenticated;
            return Err(err);
        }
        tracing::info!(owner = %session.owner_id, "signed in");
        self.session = Some(session);
        self.refresh()
    }

    /// Replace local state with the signed-in owner's remote data
    pub fn refresh(&mut self) -> Result<RefreshReport> {
        let owner_id = self
            .session
            .as_ref()
            .map(|session| session.owner_id.clone())
            .ok_or(Error::NotSignedIn)?;
        let gateway = self.gateway.as_ref().ok_or_else(|| {
            Error::InvalidConfig("remote store is not configured".to_string())
        })?;

        self.state = SessionState::Syncing;
        let fetched = gateway
            .select_tasks(&owner_id)
            .and_then(|tasks| Ok((tasks, gateway.select_categories(&owner_id)?)));
        let (task_rows, category_rows) = match fetched {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(owner = %owner_id, error = %err, "refresh failed, keeping local state");
                self.state = SessionState::Stale;
                return Err(Error::Remote(err));
            }
        };

        let tasks: Vec<Task> = task_rows.into_iter().map(TaskRow::into_task).collect();
        let categories: Vec<Category> = category_rows
            .into_iter()
            .map(CategoryRow::into_category)
            .collect();
        let discarded_tasks = self
            .store
            .tasks()
            .iter()
            .filter(|local| !tasks.iter().any(|remote| remote.id == local.id))
            .count();
        let report = RefreshReport {
            tasks: tasks.len(),
            categories: categories.len(),
            discarded_tasks,
        };

        if let Err(err) = self.store.replace_all(tasks, categories, Utc::now()) {
            self.state = SessionState::Stale;
            return Err(err);
        }
        self.state = SessionState::Synced;
        tracing::info!(
            owner = %owner_id,
            tasks = report.tasks,
            categories = report.categories,
            "refresh complete"
        );
        Ok(report)
    }

    /// Forget the session. Local data stays.
    pub fn sign_out(&mut self) -> Result<()> {
        session::clear_session(self.store.backend(), self.store.namespace())?;
        if let Some(session) = self.session.take() {
            tracing::info!(owner = %session.owner_id, "signed out");
        }
        self.state = SessionState::Unauthenticated;
        Ok(())
    }

    // ---- helpers ----

    fn require_category(&self, id: &str) -> Result<()> {
        match self.store.category(id) {
            Some(_) => Ok(()),
            None => Err(Error::category_not_found(id)),
        }
    }

    fn orders_of(&self, ids: &[String]) -> Vec<(String, u32)> {
        self.store
            .tasks()
            .iter()
            .filter(|task| ids.contains(&task.id))
            .map(|task| (task.id.clone(), task.order))
            .collect()
    }

    /// Run remote calls for the signed-in owner
    fn push<F>(&self, op: F) -> RemoteStatus
    where
        F: FnOnce(&G, &str) -> GatewayResult<()>,
    {
        let (Some(gateway), Some(session)) = (&self.gateway, &self.session) else {
            return RemoteStatus::Offline;
        };
        match op(gateway, &session.owner_id) {
            Ok(()) => RemoteStatus::Synced,
            Err(err) => {
                tracing::warn!(error = %err, "remote write failed; local change kept");
                RemoteStatus::Failed(err)
            }
        }
    }
}

fn push_orders<G: RemoteGateway>(gateway: &G, orders: &[(String, u32)]) -> GatewayResult<()> {
    for (id, order) in orders {
        gateway.update_task(id, &TaskRowPatch::order(*order))?;
    }
    Ok(())
}
