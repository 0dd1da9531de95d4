//! taskflow - local-first task management library
//!
//! This library provides the core functionality for the taskflow CLI:
//! a durable local store mirrored to a hosted database while signed in.
//!
//! # Core Concepts
//!
//! - **Optimistic commit**: every mutation lands locally first; the remote
//!   write is best effort and never rolled back
//! - **Full refresh**: signing in replaces local data with the remote copy
//! - **Dense order**: tasks carry a collection-wide position `0..N`
//! - **Streaks and achievements**: derived from completion dates
//!
//! # Module Organization
//!
//! - `model`: Task and category records, patches and validation
//! - `store`: Local store over keyed blob backends
//! - `lock`: File locking and atomic writes for the file backend
//! - `remote`: Gateway contract, PostgREST client and in-memory fake
//! - `session`: Sign-in state and its persistence
//! - `coordinator`: Local-then-remote mutation protocol and refresh
//! - `ordering`: Order maintenance and alternate sort views
//! - `query`: Task filtering
//! - `metrics`, `achievements`, `dashboard`: Read-side summaries
//! - `config`: Configuration loading from `taskflow.toml`
//! - `error`: Error types and result aliases
//! - `output`: JSON envelope and human output
//! - `cli`: Command-line interface using clap

pub mod achievements;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod lock;
pub mod metrics;
pub mod model;
pub mod ordering;
pub mod output;
pub mod query;
pub mod remote;
pub mod session;
pub mod store;

pub use error::{Error, Result};
