//! Remote store access.
//!
//! The hosted database is reached only through [`RemoteGateway`], a small
//! CRUD contract over two owner-scoped tables. Calls are never retried and
//! never buffered: a failure is returned to the caller and that is the end
//! of it.

use thiserror::Error;

pub mod memory;
pub mod rest;
pub mod rows;

pub use memory::MemoryGateway;
pub use rest::RestGateway;
pub use rows::{CategoryRow, CategoryRowPatch, TaskRow, TaskRowPatch};

/// Failure of a single remote call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("server rejected request (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Short machine-readable kind for JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Network(_) => "network",
            GatewayError::Timeout => "timeout",
            GatewayError::Unauthorized { .. } => "unauthorized",
            GatewayError::Server { .. } => "server",
            GatewayError::Decode(_) => "decode",
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// CRUD contract against the hosted `tasks` and `categories` tables
///
/// Rows carry their owner id; selects are scoped by it. Updates and deletes
/// address a single row by id.
pub trait RemoteGateway {
    fn select_tasks(&self, owner_id: &str) -> GatewayResult<Vec<TaskRow>>;

    fn select_categories(&self, owner_id: &str) -> GatewayResult<Vec<CategoryRow>>;

    fn insert_task(&self, row: &TaskRow) -> GatewayResult<()>;

    fn update_task(&self, id: &str, patch: &TaskRowPatch) -> GatewayResult<()>;

    fn delete_task(&self, id: &str) -> GatewayResult<()>;

    /// `UPDATE tasks SET category_id = NULL WHERE category_id = :id`
    fn clear_category(&self, category_id: &str) -> GatewayResult<()>;

    fn insert_category(&self, row: &CategoryRow) -> GatewayResult<()>;

    fn update_category(&self, id: &str, patch: &CategoryRowPatch) -> GatewayResult<()>;

    fn delete_category(&self, id: &str) -> GatewayResult<()>;
}

impl<G: RemoteGateway + ?Sized> RemoteGateway for Box<G> {
    fn select_tasks(&self, owner_id: &str) -> GatewayResult<Vec<TaskRow>> {
        (**self).select_tasks(owner_id)
    }

    fn select_categories(&self, owner_id: &str) -> GatewayResult<Vec<CategoryRow>> {
        (**self).select_categories(owner_id)
    }

    fn insert_task(&self, row: &TaskRow) -> GatewayResult<()> {
        (**self).insert_task(row)
    }

    fn update_task(&self, id: &str, patch: &TaskRowPatch) -> GatewayResult<()> {
        (**self).update_task(id, patch)
    }

    fn delete_task(&self, id: &str) -> GatewayResult<()> {
        (**self).delete_task(id)
    }

    fn clear_category(&self, category_id: &str) -> GatewayResult<()> {
        (**self).clear_category(category_id)
    }

    fn insert_category(&self, row: &CategoryRow) -> GatewayResult<()> {
        (**self).insert_category(row)
    }

    fn update_category(&self, id: &str, patch: &CategoryRowPatch) -> GatewayResult<()> {
        (**self).update_category(id, patch)
    }

    fn delete_category(&self, id: &str) -> GatewayResult<()> {
        (**self).delete_category(id)
    }
}
