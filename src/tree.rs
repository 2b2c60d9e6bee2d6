//! Hierarchical view of the store.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Priority, Status, TaskRecord};
use crate::path::{PathPrefix, TaskPath};
use crate::store::TaskStore;

/// Name of the node returned for an unscoped tree.
pub const ROOT_NAME: &str = "root";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Folder {
        name: String,
        children: Vec<TreeNode>,
    },
    Task {
        name: String,
        path: TaskPath,
        title: String,
        status: Status,
        priority: Priority,
        tags: BTreeSet<String>,
    },
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::Folder { name, .. } | TreeNode::Task { name, .. } => name,
        }
    }

    /// Children of a folder; empty for a task.
    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Folder { children, .. } => children,
            TreeNode::Task { .. } => &[],
        }
    }

    /// Number of task leaves below this node.
    pub fn task_count(&self) -> usize {
        match self {
            TreeNode::Folder { children, .. } => children.iter().map(TreeNode::task_count).sum(),
            TreeNode::Task { .. } => 1,
        }
    }
}

#[derive(Default)]
struct FolderBuilder {
    folders: BTreeMap<String, FolderBuilder>,
    tasks: BTreeMap<String, TreeNode>,
}

impl FolderBuilder {
    fn insert(&mut self, relative: &[String], record: &TaskRecord) {
        let Some((file, folders)) = relative.split_last() else {
            return;
        };
        let folder = folders.iter().fold(self, |node, segment| {
            node.folders.entry(segment.clone()).or_default()
        });
        folder.tasks.insert(
            file.clone(),
            TreeNode::Task {
                name: file.clone(),
                path: record.path.clone(),
                title: record.title.clone(),
                status: record.status,
                priority: record.priority,
                tags: record.tags.clone(),
            },
        );
    }

    fn finish(self, name: String) -> TreeNode {
        let children = self
            .folders
            .into_iter()
            .map(|(name, folder)| folder.finish(name))
            .chain(self.tasks.into_values())
            .collect();
        TreeNode::Folder { name, children }
    }
}

/// Build the folder tree of the whole store or of one project subtree.
///
/// Folders precede tasks at every level, each group ordered by name.
pub fn build_tree(store: &TaskStore, scope: Option<&PathPrefix>) -> Result<TreeNode> {
    if let Some(scope) = scope {
        if !store.project_exists(scope.project()) {
            return Err(Error::ProjectNotFound(scope.project().to_string()));
        }
        if !scope.to_fs_path(store.root()).is_dir() {
            return Err(Error::NotFound(scope.to_string()));
        }
    }

    let mut root = FolderBuilder::default();
    if scope.is_none() {
        for project in store.projects()? {
            root.folders.entry(project).or_default();
        }
    }

    let skip = scope.map(|scope| scope.segments().len()).unwrap_or(0);
    for record in store.scan(scope)? {
        root.insert(&record.path.segments()[skip..], &record);
    }

    let name = scope
        .and_then(|scope| scope.segments().last().cloned())
        .unwrap_or_else(|| ROOT_NAME.to_string());
    Ok(root.finish(name))
}
