//! taskflow init command implementation
//!
//! Creates the data directory and a default `taskflow.toml`.

use std::path::PathBuf;

use crate::cli::GlobalOptions;
use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    config: PathBuf,
    created: bool,
}

pub fn run(global: &GlobalOptions, force: bool) -> Result<()> {
    let data_dir = global.resolve_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let config_path = global.config_path(&data_dir);

    let created = force || !config_path.exists();
    if created {
        Config::default().save(&config_path)?;
    }

    let report = InitReport {
        data_dir,
        config: config_path.clone(),
        created,
    };

    let header = if created {
        format!("init: wrote {}", config_path.display())
    } else {
        format!("init: {} already exists", config_path.display())
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Data dir", report.data_dir.display().to_string());
    if !created {
        human.push_next_step("taskflow init --force");
    }
    human.push_next_step("set remote.url and remote.api_key, then taskflow login");

    emit_success(global.output(), "init", &report, Some(&human))
}
