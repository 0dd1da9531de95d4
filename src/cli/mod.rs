//! Command-line interface for taskflow
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::{default_data_dir, Config, CONFIG_FILE};
use crate::coordinator::{Coordinator, RemoteStatus};
use crate::error::{Error, Result};
use crate::model::{Category, Task};
use crate::output::{HumanOutput, OutputOptions};
use crate::remote::rest::RestConfig;
use crate::remote::{RemoteGateway, RestGateway};
use crate::session;
use crate::store::{FileBackend, LocalStore};

mod account;
mod category;
mod init;
mod insights;
mod task;

/// taskflow - local-first task manager
///
/// Tasks and categories live in a local data directory and are mirrored to a
/// hosted database while signed in.
#[derive(Parser, Debug)]
#[command(name = "taskflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "TASKFLOW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to <data-dir>/taskflow.toml)
    #[arg(long, global = true, env = "TASKFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Remote store base URL, overriding remote.url
    #[arg(long, global = true, env = "TASKFLOW_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Remote store API key, overriding remote.api_key
    #[arg(long, global = true, env = "TASKFLOW_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default taskflow.toml into the data directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Category management
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Sign in and replace local data with the remote copy
    Login {
        /// Owner (user) id that scopes remote rows
        #[arg(long)]
        owner: String,

        /// Access token for the remote store
        #[arg(long, env = "TASKFLOW_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Sign out; local data is kept
    Logout,

    /// Re-fetch everything from the remote store, overwriting local data
    Sync,

    /// Show session and storage status
    Status,

    /// Task summary and contribution calendar
    Dashboard {
        /// Highlighted calendar window in days: 30, 90, 180 or 365
        #[arg(long, default_value = "30")]
        range: String,

        /// Include every calendar day in human output
        #[arg(long)]
        calendar: bool,
    },

    /// Streaks and achievement levels
    Achievements,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task at the end of the list
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// pending, in_progress or completed
        #[arg(long)]
        status: Option<String>,

        /// low, medium or high
        #[arg(short, long)]
        priority: Option<String>,

        /// Category id (or unique prefix)
        #[arg(short, long)]
        category: Option<String>,

        /// Due date: YYYY-MM-DD (end of that local day) or RFC 3339
        #[arg(long)]
        due: Option<String>,
    },

    /// List tasks
    #[command(alias = "ls")]
    List {
        /// Case-insensitive match on title and description
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        /// order, due_date, priority, created_at or title
        #[arg(long, default_value = "order")]
        sort: String,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },

    /// Show one task
    Show { id: String },

    /// Edit task fields
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        #[arg(long)]
        clear_description: bool,

        #[arg(long)]
        status: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,

        #[arg(short, long, conflicts_with = "no_category")]
        category: Option<String>,

        /// Remove the category
        #[arg(long)]
        no_category: bool,

        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        #[arg(long)]
        clear_due: bool,
    },

    /// Mark a task completed
    Done { id: String },

    /// Delete a task
    #[command(alias = "delete")]
    Rm { id: String },

    /// Move a task to a position (0-based) in the manual order
    Move { id: String, index: usize },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Create a category
    Add {
        name: String,

        /// Hex color, #rgb or #rrggbb
        #[arg(long, default_value = "#3b82f6")]
        color: String,
    },

    /// List categories with task counts
    #[command(alias = "ls")]
    List,

    /// Rename or recolor a category
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a category; its tasks become uncategorized
    #[command(alias = "delete")]
    Rm { id: String },
}

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub remote_url: Option<String>,
    pub api_key: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    pub fn config_path(&self, data_dir: &std::path::Path) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| data_dir.join(CONFIG_FILE))
    }

    /// An explicit `--config` must load; the implicit one falls back to defaults
    pub fn load_config(&self, data_dir: &std::path::Path) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(&data_dir.join(CONFIG_FILE)),
        };
        if let Some(url) = &self.remote_url {
            config.remote.url = Some(url.clone());
        }
        if let Some(key) = &self.api_key {
            config.remote.api_key = Some(key.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

pub(crate) type AppCoordinator = Coordinator<FileBackend, Box<dyn RemoteGateway>>;

/// Everything a command needs: config, paths and the coordinator
pub(crate) struct Context {
    pub config: Config,
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub coordinator: AppCoordinator,
}

impl Context {
    pub fn open(global: &GlobalOptions) -> Result<Self> {
        Self::open_with_token(global, None)
    }

    /// Open with `token` in place of the persisted session token (sign-in)
    pub fn open_with_token(global: &GlobalOptions, token: Option<&str>) -> Result<Self> {
        let data_dir = global.resolve_data_dir()?;
        std::fs::create_dir_all(&data_dir)?;
        let config = global.load_config(&data_dir)?;
        let config_path = global.config_path(&data_dir);

        let backend = FileBackend::new(&data_dir);
        let persisted = session::load_session(&backend, &config.namespace);
        let token = token
            .map(str::to_string)
            .or_else(|| persisted.map(|session| session.access_token));
        let gateway = match token {
            Some(token) => build_gateway(&config, token)?,
            None => None,
        };

        let store = LocalStore::load(backend, config.namespace.clone());
        tracing::debug!(data_dir = %data_dir.display(), "context opened");
        Ok(Self {
            config,
            data_dir,
            config_path,
            coordinator: Coordinator::new(store, gateway),
        })
    }

    /// Resolve a task by id or unique id prefix
    pub fn task(&self, id: &str) -> Result<Task> {
        resolve_by_prefix(self.coordinator.store().tasks(), id, |task| &task.id)
            .ok_or_else(|| Error::task_not_found(id))?
            .cloned()
    }

    /// Resolve a category by id or unique id prefix
    pub fn category(&self, id: &str) -> Result<Category> {
        resolve_by_prefix(self.coordinator.store().categories(), id, |c| &c.id)
            .ok_or_else(|| Error::category_not_found(id))?
            .cloned()
    }
}

fn build_gateway(config: &Config, token: String) -> Result<Option<Box<dyn RemoteGateway>>> {
    let Some((url, api_key)) = config.remote.endpoint() else {
        return Ok(None);
    };
    let gateway: Box<dyn RemoteGateway> = Box::new(RestGateway::new(RestConfig {
        base_url: url.to_string(),
        api_key: api_key.to_string(),
        access_token: token,
        timeout: config.remote.timeout(),
    })?);
    Ok(Some(gateway))
}

/// Exact match first, then a unique prefix. An ambiguous prefix is an error.
fn resolve_by_prefix<'a, T>(
    items: &'a [T],
    needle: &str,
    id_of: impl Fn(&T) -> &String,
) -> Option<Result<&'a T>> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    if let Some(exact) = items.iter().find(|item| id_of(item) == needle) {
        return Some(Ok(exact));
    }
    let mut matches = items.iter().filter(|item| id_of(item).starts_with(needle));
    let first = matches.next()?;
    if matches.next().is_some() {
        return Some(Err(Error::InvalidArgument(format!(
            "id prefix '{needle}' is ambiguous"
        ))));
    }
    Some(Ok(first))
}

/// Remote outcome as reported in JSON
#[derive(Debug, Serialize)]
pub(crate) struct RemoteOutput {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<&RemoteStatus> for RemoteOutput {
    fn from(status: &RemoteStatus) -> Self {
        Self {
            status: status.as_str(),
            error: match status {
                RemoteStatus::Failed(err) => Some(err.to_string()),
                RemoteStatus::Offline | RemoteStatus::Synced => None,
            },
        }
    }
}

/// Summary line plus a warning when the remote write failed
pub(crate) fn report_remote(human: &mut HumanOutput, status: &RemoteStatus) {
    human.push_summary("Remote", status.as_str());
    if let RemoteStatus::Failed(err) = status {
        human.push_warning(format!(
            "saved locally, but the remote store was not updated: {err}"
        ));
    }
}

/// Parse a due date: `YYYY-MM-DD` means the end of that local day
pub(crate) fn parse_due(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        Error::InvalidArgument(format!(
            "invalid due date '{value}' (expected YYYY-MM-DD or RFC 3339)"
        ))
    })?;
    let end_of_day = date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN));
    Local
        .from_local_datetime(&end_of_day)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| Error::InvalidArgument(format!("due date '{value}' does not exist locally")))
}

/// First eight characters of an id, for human output
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

impl Cli {
    fn global(&self) -> GlobalOptions {
        GlobalOptions {
            data_dir: self.data_dir.clone(),
            config: self.config.clone(),
            remote_url: self.remote_url.clone(),
            api_key: self.api_key.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::Init { force } => init::run(&global, force),
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    title,
                    description,
                    status,
                    priority,
                    category,
                    due,
                } => task::run_add(
                    &global,
                    task::AddOptions {
                        title,
                        description,
                        status,
                        priority,
                        category,
                        due,
                    },
                ),
                TaskCommands::List {
                    search,
                    status,
                    priority,
                    category,
                    sort,
                    desc,
                } => task::run_list(
                    &global,
                    task::ListOptions {
                        search,
                        status,
                        priority,
                        category,
                        sort,
                        desc,
                    },
                ),
                TaskCommands::Show { id } => task::run_show(&global, &id),
                TaskCommands::Edit {
                    id,
                    title,
                    description,
                    clear_description,
                    status,
                    priority,
                    category,
                    no_category,
                    due,
                    clear_due,
                } => task::run_edit(
                    &global,
                    task::EditOptions {
                        id,
                        title,
                        description,
                        clear_description,
                        status,
                        priority,
                        category,
                        no_category,
                        due,
                        clear_due,
                    },
                ),
                TaskCommands::Done { id } => task::run_done(&global, &id),
                TaskCommands::Rm { id } => task::run_rm(&global, &id),
                TaskCommands::Move { id, index } => task::run_move(&global, &id, index),
            },
            Commands::Category(cmd) => match cmd {
                CategoryCommands::Add { name, color } => category::run_add(&global, name, color),
                CategoryCommands::List => category::run_list(&global),
                CategoryCommands::Edit { id, name, color } => {
                    category::run_edit(&global, &id, name, color)
                }
                CategoryCommands::Rm { id } => category::run_rm(&global, &id),
            },
            Commands::Login { owner, token } => account::run_login(&global, &owner, &token),
            Commands::Logout => account::run_logout(&global),
            Commands::Sync => account::run_sync(&global),
            Commands::Status => account::run_status(&global),
            Commands::Dashboard { range, calendar } => {
                insights::run_dashboard(&global, &range, calendar)
            }
            Commands::Achievements => insights::run_achievements(&global),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_resolution() {
        let ids = vec!["abc123".to_string(), "abd456".to_string()];
        let found = resolve_by_prefix(&ids, "abc", |id| id).unwrap().unwrap();
        assert_eq!(found, "abc123");
        assert!(resolve_by_prefix(&ids, "ab", |id| id).unwrap().is_err());
        assert!(resolve_by_prefix(&ids, "zz", |id| id).is_none());
    }

    #[test]
    fn due_date_forms() {
        let rfc = parse_due("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(rfc.to_rfc3339(), "2024-05-01T10:00:00+00:00");

        let day = parse_due("2024-05-01").unwrap();
        assert_eq!(
            day.with_timezone(&Local).date_naive(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert!(parse_due("tomorrow").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
