//! taskmaster search/tree/tags command implementations.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cli::task::summary_line;
use crate::cli::{parse_priority, parse_status, Context};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::path::PathPrefix;
use crate::search::{search, SearchHit, SearchQuery, TagMatch};
use crate::tags::tag_counts;
use crate::tree::{build_tree, TreeNode};

pub struct SearchOptions {
    pub query: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub any_tag: bool,
    pub path: Option<String>,
    pub limit: Option<usize>,
    pub include_content: bool,
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct TreeOptions {
    pub subpath: Option<String>,
    pub project: Option<String>,
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct TagsOptions {
    pub project: Option<String>,
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct SearchOutput {
    total: usize,
    results: Vec<SearchHit>,
}

#[derive(serde::Serialize)]
struct TagsOutput {
    total: usize,
    tags: BTreeMap<String, usize>,
}

pub fn run_search(options: SearchOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let mut query = SearchQuery::new(
        options
            .limit
            .unwrap_or(ctx.config.search.default_max_results),
    )
    .tags(options.tags)
    .include_content(options.include_content)
    .snippet_radius(ctx.config.search.snippet_radius);
    if let Some(text) = options.query {
        query = query.text(text);
    }
    if let Some(status) = parse_status(options.status.as_deref())? {
        query = query.status(status);
    }
    if let Some(priority) = parse_priority(options.priority.as_deref())? {
        query = query.priority(priority);
    }
    if options.any_tag {
        query = query.tag_match(TagMatch::Any);
    }
    if let Some(path) = options.path {
        query = query.path_pattern(path);
    }

    let results = search(&ctx.store, &query)?;
    let output = SearchOutput {
        total: results.len(),
        results,
    };

    let mut human = HumanOutput::new("Search results");
    human.push_summary("Matches", output.total.to_string());
    for hit in &output.results {
        let mut line = format!("{:>4} {}", hit.score, summary_line(&hit.task));
        if !hit.snippet.is_empty() {
            line.push_str(&format!("\n      {}", hit.snippet.replace('\n', " ")));
        }
        human.push_detail(line);
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "search",
        &output,
        Some(&human),
    )
}

pub fn run_tree(options: TreeOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let scope = PathPrefix::resolve(options.project.as_deref(), options.subpath.as_deref())?;
    let tree = build_tree(&ctx.store, scope.as_ref())?;

    let mut human = HumanOutput::new(format!("{}/", tree.name()));
    human.push_summary("Tasks", tree.task_count().to_string());
    let mut lines = Vec::new();
    render_tree(&tree, "", &mut lines);
    for line in lines {
        human.push_detail(line);
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "tree",
        &tree,
        Some(&human),
    )
}

pub fn run_tags(options: TagsOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let tags = tag_counts(&ctx.store, options.project.as_deref())?;
    let output = TagsOutput {
        total: tags.len(),
        tags,
    };

    let mut human = HumanOutput::new("Tags");
    human.push_summary("Total", output.total.to_string());
    for (tag, count) in &output.tags {
        human.push_detail(format!("{tag} ({count})"));
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "tags",
        &output,
        Some(&human),
    )
}

fn render_tree(node: &TreeNode, indent: &str, lines: &mut Vec<String>) {
    for child in node.children() {
        match child {
            TreeNode::Folder { name, .. } => {
                lines.push(format!("{indent}{name}/"));
                render_tree(child, &format!("{indent}  "), lines);
            }
            TreeNode::Task {
                name,
                title,
                status,
                ..
            } => lines.push(format!("{indent}{name} [{status}] {title}")),
        }
    }
}
