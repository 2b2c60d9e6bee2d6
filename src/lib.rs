//! taskmaster - Project-Scoped Task Card Library
//!
//! This library provides the core functionality for the taskmaster CLI and
//! its tool server: a store of markdown task cards kept as plain files, and a
//! keyword search engine over them.
//!
//! # Core Concepts
//!
//! - **Task cards**: one file per task, a TOML header fenced by `+++` lines
//!   followed by free text
//! - **Projects**: the first path segment; every card lives in one
//! - **Search**: weighted term counts over title and body, with status,
//!   priority, tag and path filters
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskmaster.toml`
//! - `document`: On-disk card format
//! - `error`: Error types and result aliases
//! - `lock`: File locking and atomic writes
//! - `mcp`: JSON-RPC tool dispatcher for agent clients
//! - `model`: Card records, metadata enums and patches
//! - `output`: Human and JSON output envelopes
//! - `path`: Project-scoped task paths
//! - `search`: Keyword search and ranking
//! - `store`: The task store itself
//! - `tags`, `tree`: Aggregate views

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod lock;
pub mod mcp;
pub mod model;
pub mod output;
pub mod path;
pub mod search;
pub mod store;
pub mod tags;
pub mod tree;

pub use error::{Error, Result};
pub use model::{NewTask, Priority, Status, TaskPatch, TaskRecord, TaskSummary};
pub use path::{PathPrefix, TaskPath};
pub use search::{SearchHit, SearchQuery, TagMatch};
pub use store::{ListOptions, TaskStore};
