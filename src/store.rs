//! Project-scoped task store.
//!
//! Every task card is one file under the store root:
//!
//! ```text
//! <root>/
//!   .taskmaster.lock          # advisory lock held by mutations
//!   <project>/
//!     .project                # marker for explicitly created projects
//!     <folder>/.../<name>.md  # task cards (see `document`)
//! ```
//!
//! The directory tree is the only source of truth; nothing is cached between
//! calls. Names starting with `.` belong to the store and are never
//! enumerated as tasks; files without the `.md` extension are ignored.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::document::{self, ExtraKeys};
use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::model::{
    bump_timestamp, normalize_tags, validate_title, NewTask, TaskPatch, TaskRecord, TaskSummary,
};
use crate::path::{is_card_name, is_hidden_name, validate_project, PathPrefix, TaskPath};

/// Lock file serializing mutations across processes.
pub const LOCK_FILE: &str = ".taskmaster.lock";

/// Marker keeping an explicitly created project alive while it is empty.
pub const PROJECT_MARKER: &str = ".project";

/// Options for [`TaskStore::list`].
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    /// Include documents in nested folders
    pub recursive: bool,
    /// Include full content in each summary
    pub include_content: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            include_content: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl TaskStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_lock_timeout(root, DEFAULT_LOCK_TIMEOUT_MS)
    }

    pub fn with_lock_timeout(root: impl Into<PathBuf>, lock_timeout_ms: u64) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        tracing::debug!(root = %root.display(), "opened task store");
        Ok(Self {
            root,
            lock_timeout_ms,
        })
    }

    /// Open the store a config resolves to, with an optional root override.
    pub fn from_config(config: &Config, override_dir: Option<&Path>) -> Result<Self> {
        Self::with_lock_timeout(
            config.resolve_tasks_dir(override_dir),
            config.store.lock_timeout_ms,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> Result<FileLock> {
        FileLock::acquire(self.root.join(LOCK_FILE), self.lock_timeout_ms)
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    pub fn create(&self, path: &TaskPath, task: NewTask) -> Result<TaskRecord> {
        ensure_card(path)?;
        let title = validate_title(&task.title)?;
        let tags = normalize_tags(&task.tags)?;

        let _lock = self.lock()?;
        self.ensure_folders(path)?;
        let target = path.to_fs_path(&self.root);
        if exists(&target) {
            return Err(Error::AlreadyExists(path.to_string()));
        }

        let now = Utc::now();
        let record = TaskRecord {
            path: path.clone(),
            title,
            content: task.content,
            status: task.status,
            priority: task.priority,
            tags,
            created: now,
            updated: now,
            extra: ExtraKeys::default(),
        };
        let text = document::render(&record)?;
        if !lock::write_new(&target, text.as_bytes())? {
            return Err(Error::AlreadyExists(path.to_string()));
        }

        tracing::debug!(path = %path, "created task");
        Ok(record)
    }

    pub fn read(&self, path: &TaskPath) -> Result<TaskRecord> {
        if !path.is_card() {
            return Err(Error::NotFound(path.to_string()));
        }
        let file = path.to_fs_path(&self.root);
        let metadata = match fs::metadata(&file) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(Error::NotFound(path.to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        self.load(path, &file, &metadata)
    }

    pub fn update(&self, path: &TaskPath, patch: &TaskPatch) -> Result<TaskRecord> {
        let _lock = self.lock()?;
        let mut record = self.read(path)?;
        patch.apply(&mut record)?;
        record.updated = bump_timestamp(record.updated);

        let text = document::render(&record)?;
        lock::write_atomic(path.to_fs_path(&self.root), text.as_bytes())?;

        tracing::debug!(path = %path, "updated task");
        Ok(record)
    }

    pub fn delete(&self, path: &TaskPath) -> Result<()> {
        let _lock = self.lock()?;
        let file = path.to_fs_path(&self.root);
        if !path.is_card() || !file.is_file() {
            return Err(Error::NotFound(path.to_string()));
        }
        fs::remove_file(&file).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.to_string()),
            _ => Error::Io(err),
        })?;
        self.prune_empty_folders(path.parent_segments());

        tracing::debug!(path = %path, "deleted task");
        Ok(())
    }

    /// Relocate a task. `created` is kept, `updated` is bumped.
    pub fn move_task(&self, from: &TaskPath, to: &TaskPath) -> Result<TaskRecord> {
        ensure_card(to)?;
        let _lock = self.lock()?;
        let mut record = self.read(from)?;
        self.ensure_folders(to)?;
        let target = to.to_fs_path(&self.root);
        if exists(&target) {
            return Err(Error::AlreadyExists(to.to_string()));
        }

        record.path = to.clone();
        record.updated = bump_timestamp(record.updated);
        let text = document::render(&record)?;
        if !lock::write_new(&target, text.as_bytes())? {
            return Err(Error::AlreadyExists(to.to_string()));
        }
        fs::remove_file(from.to_fs_path(&self.root))?;
        self.prune_empty_folders(from.parent_segments());

        tracing::debug!(from = %from, to = %to, "moved task");
        Ok(record)
    }

    /// Summaries of every task under `prefix` (or the whole store), by path.
    pub fn list(
        &self,
        prefix: Option<&PathPrefix>,
        options: ListOptions,
    ) -> Result<Vec<TaskSummary>> {
        let direct_depth = prefix.map(|p| p.segments().len() + 1).unwrap_or(2);
        Ok(self
            .scan(prefix)?
            .iter()
            .filter(|record| options.recursive || record.path.segments().len() == direct_depth)
            .map(|record| {
                if options.include_content {
                    record.summary_with_content()
                } else {
                    record.summary()
                }
            })
            .collect())
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub fn project_exists(&self, name: &str) -> bool {
        validate_project(name).is_ok() && self.root.join(name).is_dir()
    }

    /// Names of all project folders, sorted.
    pub fn projects(&self) -> Result<Vec<String>> {
        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_hidden_name(&name) && entry.file_type()?.is_dir() {
                projects.push(name);
            }
        }
        projects.sort();
        Ok(projects)
    }

    /// Create an empty project folder that survives without tasks.
    pub fn create_project(&self, name: &str) -> Result<()> {
        validate_project(name)?;
        let _lock = self.lock()?;
        let dir = self.root.join(name);
        if exists(&dir) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        fs::create_dir(&dir)?;
        lock::write_new(dir.join(PROJECT_MARKER), b"")?;

        tracing::debug!(project = name, "created project");
        Ok(())
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// Load every task under `prefix` (or the whole store), sorted by path.
    ///
    /// Only `.md` files are considered. Files that do not parse are skipped
    /// with a warning.
    pub fn scan(&self, prefix: Option<&PathPrefix>) -> Result<Vec<TaskRecord>> {
        let start = prefix
            .map(|prefix| prefix.to_fs_path(&self.root))
            .unwrap_or_else(|| self.root.clone());

        let walker = WalkDir::new(&start)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden_entry(entry));

        let mut records = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // Missing scope, or a file removed mid-walk.
                Err(err) if err.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => {
                    continue
                }
                Err(err) => return Err(err.into()),
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if !entry.file_name().to_str().is_some_and(is_card_name) {
                tracing::trace!(file = %entry.path().display(), "not a card");
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let path = match TaskPath::from_relative_fs(relative) {
                Ok(path) => path,
                Err(err) => {
                    tracing::debug!(file = %relative.display(), error = %err, "not a task path");
                    continue;
                }
            };
            let metadata = entry.metadata()?;
            match self.load(&path, entry.path(), &metadata) {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!(path = %path, error = %err, "skipping unreadable task"),
            }
        }

        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn load(&self, path: &TaskPath, file: &Path, metadata: &Metadata) -> Result<TaskRecord> {
        let text = fs::read_to_string(file).map_err(|err| match err.kind() {
            io::ErrorKind::InvalidData => Error::InvalidDocument {
                path: path.to_string(),
                reason: "file is not valid UTF-8".to_string(),
            },
            io::ErrorKind::NotFound => Error::NotFound(path.to_string()),
            _ => Error::Io(err),
        })?;
        let fallback = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        document::parse(path, &text, fallback)
    }

    /// Reject paths whose folders collide with existing task files.
    fn ensure_folders(&self, path: &TaskPath) -> Result<()> {
        let mut dir = self.root.clone();
        for segment in path.parent_segments() {
            dir.push(segment);
            if exists(&dir) && !dir.is_dir() {
                return Err(Error::invalid_path(
                    path.to_string(),
                    format!("'{segment}' is a task, not a folder"),
                ));
            }
        }
        Ok(())
    }

    /// Remove folders left empty, deepest first, never the root itself.
    fn prune_empty_folders(&self, segments: &[String]) {
        for depth in (1..=segments.len()).rev() {
            let mut dir = self.root.clone();
            dir.extend(&segments[..depth]);
            let empty = fs::read_dir(&dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !empty || fs::remove_dir(&dir).is_err() {
                break;
            }
        }
    }
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn ensure_card(path: &TaskPath) -> Result<()> {
    if path.is_card() {
        Ok(())
    } else {
        Err(Error::invalid_path(
            path.to_string(),
            "task cards must use the '.md' extension",
        ))
    }
}

fn is_hidden_entry(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(is_hidden_name)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Status};

    fn setup_store() -> (tempfile::TempDir, TaskStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TaskStore::open(dir.path().join("tasks")).expect("open store");
        (dir, store)
    }

    fn path(raw: &str) -> TaskPath {
        TaskPath::parse(raw).expect("valid path")
    }

    #[test]
    fn create_writes_a_hand_editable_file() {
        let (_dir, store) = setup_store();
        let record = store
            .create(
                &path("proj/x.md"),
                NewTask::new("Auth").content("token check token").tags(["Backend"]),
            )
            .expect("create");
        assert_eq!(record.created, record.updated);

        let text = fs::read_to_string(store.root().join("proj").join("x.md")).unwrap();
        assert!(text.starts_with("+++\n"));
        assert!(text.contains("title = \"Auth\""));
        assert!(text.contains("tags = [\"backend\"]"));
        assert!(text.ends_with("+++\ntoken check token"));
    }

    #[test]
    fn folder_colliding_with_task_is_invalid_path() {
        let (_dir, store) = setup_store();
        store.create(&path("proj/a.md"), NewTask::new("A")).unwrap();
        let err = store
            .create(&path("proj/a.md/b.md"), NewTask::new("B"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn delete_prunes_empty_folders_but_keeps_explicit_projects() {
        let (_dir, store) = setup_store();
        store.create(&path("proj/deep/er/a.md"), NewTask::new("A")).unwrap();
        store.delete(&path("proj/deep/er/a.md")).unwrap();
        assert!(!store.root().join("proj").exists());

        store.create_project("kept").unwrap();
        store.create(&path("kept/sub/b.md"), NewTask::new("B")).unwrap();
        store.delete(&path("kept/sub/b.md")).unwrap();
        assert!(store.root().join("kept").is_dir());
        assert!(!store.root().join("kept").join("sub").exists());
        assert!(store.project_exists("kept"));
    }

    #[test]
    fn create_project_rejects_duplicates_and_bad_names() {
        let (_dir, store) = setup_store();
        store.create_project("alpha").unwrap();
        assert!(matches!(
            store.create_project("alpha"),
            Err(Error::AlreadyExists(_))
        ));
        assert!(matches!(
            store.create_project(".hidden"),
            Err(Error::InvalidPath { .. })
        ));
        assert_eq!(store.projects().unwrap(), ["alpha"]);
    }

    #[test]
    fn scan_skips_hidden_and_unreadable_files() {
        let (_dir, store) = setup_store();
        store.create(&path("proj/good.md"), NewTask::new("Good")).unwrap();
        fs::write(store.root().join("proj").join(".draft.md"), "hidden").unwrap();
        fs::write(
            store.root().join("proj").join("bad.md"),
            "+++\npriority = \"urgent\"\n+++\n",
        )
        .unwrap();
        fs::write(store.root().join("loose.md"), "no project").unwrap();

        let records = store.scan(None).unwrap();
        let paths: Vec<String> = records.iter().map(|r| r.path.to_string()).collect();
        assert_eq!(paths, ["proj/good.md"]);

        let err = store.read(&path("proj/bad.md")).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
    }

    #[test]
    fn only_md_files_are_cards() {
        let (_dir, store) = setup_store();
        store
            .create(&path("proj/card.md"), NewTask::new("Card").content("token"))
            .unwrap();
        fs::write(store.root().join("proj").join("README.txt"), "token notes").unwrap();
        fs::write(store.root().join("proj").join("card.md~"), "token backup").unwrap();

        let listed = store.list(None, ListOptions::default()).unwrap();
        let paths: Vec<String> = listed.iter().map(|s| s.path.to_string()).collect();
        assert_eq!(paths, ["proj/card.md"]);

        assert!(matches!(
            store.read(&path("proj/README.txt")),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&path("proj/README.txt")),
            Err(Error::NotFound(_))
        ));
        assert!(store.root().join("proj").join("README.txt").is_file());
        assert!(matches!(
            store.create(&path("proj/notes.txt"), NewTask::new("Notes")),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            store.move_task(&path("proj/card.md"), &path("proj/card.txt")),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn list_respects_prefix_and_recursion() {
        let (_dir, store) = setup_store();
        store.create(&path("proj/a.md"), NewTask::new("A")).unwrap();
        store.create(&path("proj/sub/b.md"), NewTask::new("B")).unwrap();
        store.create(&path("other/c.md"), NewTask::new("C")).unwrap();

        let all = store.list(None, ListOptions::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|summary| summary.content.is_none()));

        let proj = PathPrefix::parse("proj").unwrap();
        let shallow = store
            .list(
                Some(&proj),
                ListOptions {
                    recursive: false,
                    include_content: true,
                },
            )
            .unwrap();
        assert_eq!(shallow.len(), 1);
        assert_eq!(shallow[0].path.to_string(), "proj/a.md");
        assert_eq!(shallow[0].content.as_deref(), Some(""));

        let missing = PathPrefix::parse("nope/sub").unwrap();
        assert!(store.list(Some(&missing), ListOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn update_preserves_unknown_header_keys() {
        let (_dir, store) = setup_store();
        let file = store.root().join("proj").join("hand.md");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(
            &file,
            "+++\ntitle = \"Hand\"\nestimate = 3\n+++\nwritten in an editor\n",
        )
        .unwrap();

        let updated = store
            .update(
                &path("proj/hand.md"),
                &TaskPatch {
                    status: Some(Status::Done),
                    priority: Some(Priority::Low),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.content, "written in an editor\n");

        let text = fs::read_to_string(&file).unwrap();
        assert!(text.contains("estimate = 3"));
        assert!(text.contains("status = \"done\""));
    }

    #[test]
    fn two_stores_are_independent() {
        let (_a, first) = setup_store();
        let (_b, second) = setup_store();
        first.create(&path("proj/a.md"), NewTask::new("A")).unwrap();
        assert!(matches!(
            second.read(&path("proj/a.md")),
            Err(Error::NotFound(_))
        ));
    }
}
