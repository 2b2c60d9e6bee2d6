//! Command-line interface for taskmaster
//!
//! This module defines the CLI structure using clap derive macros.
//! Each group of subcommands is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{Priority, Status};
use crate::store::TaskStore;

mod project;
mod query;
mod serve;
mod task;

/// taskmaster - project-scoped markdown task cards
///
/// Stores task cards as hand-editable files under a tasks directory and
/// answers keyword searches over them.
#[derive(Parser, Debug)]
#[command(name = "taskmaster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Root of the task tree (defaults to config, then ./tasks)
    #[arg(long, global = true, env = "TASKMASTER_TASKS_DIR")]
    pub tasks_dir: Option<PathBuf>,

    /// Config file (defaults to ./.taskmaster.toml, then the user config)
    #[arg(long, global = true, env = "TASKMASTER_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Create a task card
    Create {
        /// Task path (project/folder/file.md)
        path: String,

        /// Title
        #[arg(short, long)]
        title: String,

        /// Body text
        #[arg(short, long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read the body from a file ("-" for stdin)
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Status: open, in-progress, blocked, done, cancelled
        #[arg(short, long)]
        status: Option<String>,

        /// Priority: low, medium, high, critical
        #[arg(long)]
        priority: Option<String>,

        /// Tags (repeatable or comma-separated)
        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,

        /// Project the path is relative to
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Show a task card
    Show {
        /// Task path
        path: String,

        /// Project the path is relative to
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Change fields of a task card
    Update {
        /// Task path
        path: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New body text
        #[arg(short, long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read the new body from a file ("-" for stdin)
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// New status
        #[arg(short, long)]
        status: Option<String>,

        /// New priority
        #[arg(long)]
        priority: Option<String>,

        /// Tags to add (repeatable or comma-separated)
        #[arg(long = "add-tag", value_delimiter = ',')]
        add_tags: Vec<String>,

        /// Tags to remove (repeatable or comma-separated)
        #[arg(long = "remove-tag", value_delimiter = ',')]
        remove_tags: Vec<String>,

        /// Project the path is relative to
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Delete a task card
    Delete {
        /// Task path
        path: String,

        /// Project the path is relative to
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Move a task card to a new path
    Move {
        /// Current path
        from: String,

        /// New path
        to: String,

        /// Project both paths are relative to
        #[arg(short, long)]
        project: Option<String>,
    },

    /// List task cards
    List {
        /// Folder to list (project or project/folder)
        subpath: Option<String>,

        /// Project the subpath is relative to
        #[arg(short, long)]
        project: Option<String>,

        /// Only cards directly inside the folder
        #[arg(long)]
        shallow: bool,

        /// Include card bodies
        #[arg(long)]
        include_content: bool,
    },

    /// Show the folder tree
    Tree {
        /// Folder to show (project or project/folder)
        subpath: Option<String>,

        /// Project the subpath is relative to
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Search task cards by keyword and metadata
    Search {
        /// Keywords
        query: Option<String>,

        /// Only cards with this status
        #[arg(short, long)]
        status: Option<String>,

        /// Only cards with this priority
        #[arg(long)]
        priority: Option<String>,

        /// Required tags (repeatable or comma-separated)
        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,

        /// Match cards carrying any of the tags instead of all
        #[arg(long)]
        any_tag: bool,

        /// Path prefix, or glob with * within and ** across folders
        #[arg(long)]
        path: Option<String>,

        /// Maximum number of results
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Include card bodies instead of snippets
        #[arg(long)]
        include_content: bool,
    },

    /// List tags in use
    Tags {
        /// Only tags used in this project
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Serve tools over newline-delimited JSON-RPC on stdin/stdout
    Serve,
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create an empty project
    New {
        /// Project name
        name: String,
    },

    /// List projects
    List,
}

/// Config and store every command works against.
pub(crate) struct Context {
    pub config: Config,
    pub store: TaskStore,
}

impl Context {
    pub fn load(tasks_dir: Option<PathBuf>, config: Option<PathBuf>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = Config::discover(config.as_deref(), &cwd)?;
        let store = TaskStore::from_config(&config, tasks_dir.as_deref())?;
        Ok(Self { config, store })
    }
}

pub(crate) fn parse_status(raw: Option<&str>) -> Result<Option<Status>> {
    raw.map(str::parse).transpose()
}

pub(crate) fn parse_priority(raw: Option<&str>) -> Result<Option<Priority>> {
    raw.map(str::parse).transpose()
}

/// Body text from `--content` or `--content-file` (`-` reads stdin).
pub(crate) fn read_content(
    content: Option<String>,
    content_file: Option<PathBuf>,
) -> Result<Option<String>> {
    if let Some(content) = content {
        return Ok(Some(content));
    }
    let Some(file) = content_file else {
        return Ok(None);
    };
    if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
        return Ok(Some(buf));
    }
    std::fs::read_to_string(&file).map(Some).map_err(|err| {
        Error::InvalidArgument(format!("cannot read {}: {err}", file.display()))
    })
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Create {
                path,
                title,
                content,
                content_file,
                status,
                priority,
                tags,
                project,
            } => task::run_create(task::CreateOptions {
                path,
                title,
                content: read_content(content, content_file)?,
                status,
                priority,
                tags,
                project,
                tasks_dir: self.tasks_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Show { path, project } => task::run_show(task::ShowOptions {
                path,
                project,
                tasks_dir: self.tasks_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Update {
                path,
                title,
                content,
                content_file,
                status,
                priority,
                add_tags,
                remove_tags,
                project,
            } => task::run_update(task::UpdateOptions {
                path,
                title,
                content: read_content(content, content_file)?,
                status,
                priority,
                add_tags,
                remove_tags,
                project,
                tasks_dir: self.tasks_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Delete { path, project } => task::run_delete(task::DeleteOptions {
                path,
                project,
                tasks_dir: self.tasks_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Move { from, to, project } => task::run_move(task::MoveOptions {
                from,
                to,
                project,
                tasks_dir: self.tasks_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::List {
                subpath,
                project,
                shallow,
                include_content,
            } => task::run_list(task::ListOptions {
                subpath,
                project,
                recursive: !shallow,
                include_content,
                tasks_dir: self.tasks_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Tree { subpath, project } => query::run_tree(query::TreeOptions {
                subpath,
                project,
                tasks_dir: self.tasks_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Search {
                query,
                status,
                priority,
                tags,
                any_tag,
                path,
                limit,
                include_content,
            } => query::run_search(query::SearchOptions {
                query,
                status,
                priority,
                tags,
                any_tag,
                path,
                limit,
                include_content,
                tasks_dir: self.tasks_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Tags { project } => query::run_tags(query::TagsOptions {
                project,
                tasks_dir: self.tasks_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Project(cmd) => match cmd {
                ProjectCommands::New { name } => project::run_new(project::NewOptions {
                    name,
                    tasks_dir: self.tasks_dir,
                    config: self.config,
                    json: self.json,
                    quiet: self.quiet,
                }),
                ProjectCommands::List => project::run_list(project::ListOptions {
                    tasks_dir: self.tasks_dir,
                    config: self.config,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Serve => serve::run(serve::ServeOptions {
                tasks_dir: self.tasks_dir,
                config: self.config,
            }),
        }
    }
}
