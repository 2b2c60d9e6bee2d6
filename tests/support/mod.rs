#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

use taskmaster::{TaskPath, TaskStore};

/// A scratch working directory with a `tasks/` store inside.
pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        // An empty local config keeps the user's own config out of the tests.
        fs::write(dir.path().join(".taskmaster.toml"), "").expect("write config");
        Self { dir }
    }

    /// Working directory commands run in.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.dir.path().join("tasks")
    }

    pub fn store(&self) -> TaskStore {
        TaskStore::open(self.tasks_dir()).expect("open store")
    }

    /// Write a file below the tasks directory, as an editor would.
    pub fn write_task_file(&self, rel_path: &str, contents: &str) -> PathBuf {
        let path = self.tasks_dir().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(&path, contents).expect("write task file");
        path
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.dir.path().join(".taskmaster.toml");
        fs::write(&path, contents).expect("write config");
        path
    }
}

pub fn path(raw: &str) -> TaskPath {
    TaskPath::parse(raw).expect("valid task path")
}

pub fn tm_cmd(store: &TestStore) -> Command {
    let mut cmd = Command::cargo_bin("taskmaster").expect("binary");
    cmd.current_dir(store.path())
        .env_remove("TASKMASTER_TASKS_DIR")
        .env_remove("TASKMASTER_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}
