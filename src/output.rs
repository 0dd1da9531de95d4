//! Command output for the taskflow CLI
//!
//! With `--json` every command prints one envelope on stdout:
//!
//! ```text
//! { "schema_version": "taskflow.v1", "command": "task add",
//!   "status": "success" | "error", "data" | "error": {...},
//!   "warnings": [...], "next_steps": [...] }
//! ```
//!
//! Otherwise the command prints a human block: a header line, then
//! `Summary`, `Details`, `Warnings` and `Next steps` sections, each omitted
//! when empty. Human errors go to stderr as `error:` plus an optional `hint:`.

use serde::Serialize;

use crate::error::{exit_codes, EntityKind, Error, Result};
use crate::remote::GatewayError;

pub const SCHEMA_VERSION: &str = "taskflow.v1";

/// Global flags that consume the following argument
const VALUE_FLAGS: &[&str] = &["--data-dir", "--config", "--remote-url", "--api-key"];

/// Command groups whose subcommand is part of the reported command name
const GROUPS: &[&str] = &["task", "category"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Human-readable report assembled by a command
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    /// `key: value` line; an empty value prints the key alone
    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

#[derive(Serialize)]
struct Envelope<'a, D: Serialize, E: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a D>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<E>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    next_steps: &'a [String],
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_envelope<D: Serialize, E: Serialize>(envelope: &Envelope<'_, D, E>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let (warnings, next_steps) = human
            .map(|h| (h.warnings.as_slice(), h.next_steps.as_slice()))
            .unwrap_or_default();
        return print_envelope(&Envelope::<T, ErrorBody> {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data: Some(data),
            error: None,
            warnings,
            next_steps,
        });
    }

    match human {
        Some(human) if !options.quiet => println!("{}", format_human(human)),
        // Quiet mode still surfaces warnings, on stderr
        Some(human) => {
            for warning in &human.warnings {
                eprintln!("warning: {warning}");
            }
        }
        None => {}
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        return print_envelope(&Envelope::<(), ErrorBody> {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            data: None,
            error: Some(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            }),
            warnings: &[],
            next_steps: &next_steps,
        });
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut text = output.header.clone();

    let summary: Vec<String> = output
        .summary
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                key.clone()
            } else {
                format!("{key}: {value}")
            }
        })
        .collect();

    for (title, items) in [
        ("Summary", summary.as_slice()),
        ("Details", output.details.as_slice()),
        ("Warnings", output.warnings.as_slice()),
        ("Next steps", output.next_steps.as_slice()),
    ] {
        if items.is_empty() {
            continue;
        }
        text.push_str(&format!("\n\n{title}:"));
        for item in items {
            text.push_str(&format!("\n- {item}"));
        }
    }
    text
}

/// Command name for the error envelope, read from raw args
///
/// Parsing may be what failed, so clap's result is not available here.
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut words = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        words.push(arg);
        let grouped = words.len() == 1 && GROUPS.contains(&words[0].as_str());
        if !grouped {
            break;
        }
    }

    if words.is_empty() {
        "taskflow".to_string()
    } else {
        words.join(" ")
    }
}

fn error_kind(err: &Error) -> &'static str {
    if err.exit_code() == exit_codes::USER_ERROR {
        "user_error"
    } else {
        "operation_failed"
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::NotSignedIn | Error::Remote(GatewayError::Unauthorized { .. }) => {
            "taskflow login --owner <id> --token <token>"
        }
        Error::NotFound {
            kind: EntityKind::Task,
            ..
        } => "taskflow task list",
        Error::NotFound {
            kind: EntityKind::Category,
            ..
        } => "taskflow category list",
        Error::InvalidConfig(_) => "fix taskflow.toml then retry",
        Error::Remote(_) => "taskflow sync",
        Error::LockFailed(_) => "retry once other taskflow processes finish",
        _ => return Vec::new(),
    };
    vec![step.to_string()]
}
