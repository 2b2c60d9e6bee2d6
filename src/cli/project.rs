//! taskmaster project command implementations.

use std::path::PathBuf;

use crate::cli::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub struct NewOptions {
    pub name: String,
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct ProjectCreateOutput {
    project: String,
}

#[derive(serde::Serialize)]
struct ProjectListOutput {
    total: usize,
    projects: Vec<String>,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    ctx.store.create_project(&options.name)?;

    let mut human = HumanOutput::new("Project created");
    human.push_summary("Name", options.name.clone());
    human.push_next_step(format!(
        "taskmaster create {}/<file>.md --title \"...\"",
        options.name
    ));
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "project new",
        &ProjectCreateOutput {
            project: options.name,
        },
        Some(&human),
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let projects = ctx.store.projects()?;
    let output = ProjectListOutput {
        total: projects.len(),
        projects,
    };

    let mut human = HumanOutput::new("Projects");
    human.push_summary("Total", output.total.to_string());
    for project in &output.projects {
        human.push_detail(project.clone());
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "project list",
        &output,
        Some(&human),
    )
}
