//! Sign-in, sign-out, refresh and status commands.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{Context, GlobalOptions};
use crate::coordinator::RefreshReport;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::session::SessionState;

#[derive(Serialize)]
struct LoginOutput {
    owner_id: String,
    state: SessionState,
    refresh: RefreshReport,
}

#[derive(Serialize)]
struct LogoutOutput {
    signed_out: Option<String>,
    tasks_kept: usize,
}

#[derive(Serialize)]
struct StatusOutput {
    data_dir: PathBuf,
    config: PathBuf,
    namespace: String,
    remote_configured: bool,
    signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_id: Option<String>,
    state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_sync: Option<DateTime<Utc>>,
    tasks: usize,
    categories: usize,
}

fn refresh_summary(human: &mut HumanOutput, report: &RefreshReport) {
    human.push_summary("Tasks", report.tasks.to_string());
    human.push_summary("Categories", report.categories.to_string());
    if report.discarded_tasks > 0 {
        human.push_warning(format!(
            "{} local-only task(s) were replaced by the remote copy",
            report.discarded_tasks
        ));
    }
}

pub fn run_login(global: &GlobalOptions, owner: &str, token: &str) -> Result<()> {
    let mut ctx = Context::open_with_token(global, Some(token))?;
    let refresh = ctx.coordinator.sign_in(owner, token)?;

    let mut human = HumanOutput::new(format!("login: signed in as {}", owner.trim()));
    refresh_summary(&mut human, &refresh);

    let output = LoginOutput {
        owner_id: owner.trim().to_string(),
        state: ctx.coordinator.state(),
        refresh,
    };
    emit_success(global.output(), "login", &output, Some(&human))
}

pub fn run_logout(global: &GlobalOptions) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let signed_out = ctx
        .coordinator
        .session()
        .map(|session| session.owner_id.clone());
    ctx.coordinator.sign_out()?;

    let header = match &signed_out {
        Some(owner) => format!("logout: signed out {owner}"),
        None => "logout: not signed in".to_string(),
    };
    let tasks_kept = ctx.coordinator.store().tasks().len();
    let mut human = HumanOutput::new(header);
    human.push_summary("Local tasks kept", tasks_kept.to_string());

    let output = LogoutOutput {
        signed_out,
        tasks_kept,
    };
    emit_success(global.output(), "logout", &output, Some(&human))
}

pub fn run_sync(global: &GlobalOptions) -> Result<()> {
    let mut ctx = Context::open(global)?;
    let report = ctx.coordinator.refresh()?;

    let mut human = HumanOutput::new("sync: local data replaced with remote copy");
    refresh_summary(&mut human, &report);
    emit_success(global.output(), "sync", &report, Some(&human))
}

pub fn run_status(global: &GlobalOptions) -> Result<()> {
    let ctx = Context::open(global)?;
    let store = ctx.coordinator.store();
    let owner_id = ctx
        .coordinator
        .session()
        .map(|session| session.owner_id.clone());

    let output = StatusOutput {
        data_dir: ctx.data_dir.clone(),
        config: ctx.config_path.clone(),
        namespace: ctx.config.namespace.clone(),
        remote_configured: ctx.config.remote.endpoint().is_some(),
        signed_in: owner_id.is_some(),
        owner_id,
        state: ctx.coordinator.state(),
        last_sync: store.last_sync(),
        tasks: store.tasks().len(),
        categories: store.categories().len(),
    };

    let mut human = HumanOutput::new("taskflow status");
    human.push_summary("Data dir", output.data_dir.display().to_string());
    human.push_summary("Namespace", output.namespace.clone());
    human.push_summary(
        "Signed in",
        output.owner_id.clone().unwrap_or_else(|| "no".to_string()),
    );
    human.push_summary(
        "Last sync",
        output
            .last_sync
            .map_or_else(|| "never".to_string(), |at| at.to_rfc3339()),
    );
    human.push_summary("Tasks", output.tasks.to_string());
    human.push_summary("Categories", output.categories.to_string());
    if !output.remote_configured {
        human.push_next_step("set remote.url and remote.api_key in taskflow.toml");
    } else if !output.signed_in {
        human.push_next_step("taskflow login --owner <id> --token <token>");
    }
    emit_success(global.output(), "status", &output, Some(&human))
}
