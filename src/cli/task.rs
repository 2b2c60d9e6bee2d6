//! taskmaster create/show/update/delete/move/list command implementations.

use std::path::PathBuf;

use crate::cli::{parse_priority, parse_status, Context};
use crate::document::format_timestamp;
use crate::error::Result;
use crate::model::{NewTask, TaskPatch, TaskRecord, TaskSummary};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::path::{PathPrefix, TaskPath};
use crate::store;

pub struct CreateOptions {
    pub path: String,
    pub title: String,
    pub content: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub project: Option<String>,
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ShowOptions {
    pub path: String,
    pub project: Option<String>,
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct UpdateOptions {
    pub path: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub project: Option<String>,
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct DeleteOptions {
    pub path: String,
    pub project: Option<String>,
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct MoveOptions {
    pub from: String,
    pub to: String,
    pub project: Option<String>,
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub subpath: Option<String>,
    pub project: Option<String>,
    pub recursive: bool,
    pub include_content: bool,
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct DeleteOutput {
    deleted: TaskPath,
}

#[derive(serde::Serialize)]
struct ListOutput {
    total: usize,
    tasks: Vec<TaskSummary>,
}

pub fn run_create(options: CreateOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let path = TaskPath::resolve(options.project.as_deref(), &options.path)?;
    let mut task = NewTask::new(options.title)
        .content(options.content.unwrap_or_default())
        .tags(options.tags);
    if let Some(status) = parse_status(options.status.as_deref())? {
        task = task.status(status);
    }
    if let Some(priority) = parse_priority(options.priority.as_deref())? {
        task = task.priority(priority);
    }

    let record = ctx.store.create(&path, task)?;
    let mut human = record_human("Task created", &record);
    human.push_next_step(format!("taskmaster show {}", record.path));
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "create",
        &record,
        Some(&human),
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let path = TaskPath::resolve(options.project.as_deref(), &options.path)?;
    let record = ctx.store.read(&path)?;

    let mut human = record_human(record.title.clone(), &record);
    if !record.content.is_empty() {
        human.push_detail(record.content.trim_end());
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "show",
        &record,
        Some(&human),
    )
}

pub fn run_update(options: UpdateOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let path = TaskPath::resolve(options.project.as_deref(), &options.path)?;
    let patch = TaskPatch {
        title: options.title,
        content: options.content,
        status: parse_status(options.status.as_deref())?,
        priority: parse_priority(options.priority.as_deref())?,
        add_tags: options.add_tags,
        remove_tags: options.remove_tags,
    };

    let record = ctx.store.update(&path, &patch)?;
    let human = record_human("Task updated", &record);
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "update",
        &record,
        Some(&human),
    )
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let path = TaskPath::resolve(options.project.as_deref(), &options.path)?;
    ctx.store.delete(&path)?;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("Path", path.to_string());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "delete",
        &DeleteOutput { deleted: path },
        Some(&human),
    )
}

pub fn run_move(options: MoveOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let from = TaskPath::resolve(options.project.as_deref(), &options.from)?;
    let to = TaskPath::resolve(options.project.as_deref(), &options.to)?;

    let record = ctx.store.move_task(&from, &to)?;
    let mut human = record_human("Task moved", &record);
    human.push_summary("From", from.to_string());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "move",
        &record,
        Some(&human),
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let prefix = PathPrefix::resolve(options.project.as_deref(), options.subpath.as_deref())?;
    let tasks = ctx.store.list(
        prefix.as_ref(),
        store::ListOptions {
            recursive: options.recursive,
            include_content: options.include_content,
        },
    )?;
    let output = ListOutput {
        total: tasks.len(),
        tasks,
    };

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", output.total.to_string());
    for task in &output.tasks {
        human.push_detail(summary_line(task));
    }
    if output.tasks.is_empty() {
        human.push_next_step("taskmaster create <project>/<file>.md --title \"...\"");
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "list",
        &output,
        Some(&human),
    )
}

fn record_human(header: impl Into<String>, record: &TaskRecord) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("Path", record.path.to_string());
    human.push_summary("Title", record.title.clone());
    human.push_summary("Status", record.status.as_str());
    human.push_summary("Priority", record.priority.as_str());
    if !record.tags.is_empty() {
        human.push_summary("Tags", join_tags(&record.tags));
    }
    human.push_summary("Created", format_timestamp(record.created));
    human.push_summary("Updated", format_timestamp(record.updated));
    human
}

pub(crate) fn summary_line(task: &TaskSummary) -> String {
    let mut line = format!(
        "{} [{}/{}] {}",
        task.path, task.status, task.priority, task.title
    );
    if !task.tags.is_empty() {
        line.push_str(&format!(" #{}", task.tags.iter().cloned().collect::<Vec<_>>().join(" #")));
    }
    line
}

pub(crate) fn join_tags<'a>(tags: impl IntoIterator<Item = &'a String>) -> String {
    tags.into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
