//! Project-scoped task paths.
//!
//! A task path is a `/`-separated sequence of segments whose first segment is
//! the project. Paths are case-sensitive and use `/` on every host, so a path
//! string read from one machine addresses the same document on another.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Canonical segment separator.
pub const SEPARATOR: char = '/';

/// Extension of every task card file.
pub const CARD_EXTENSION: &str = "md";

/// Full path of one task document: `project/.../file`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskPath {
    segments: Vec<String>,
}

impl TaskPath {
    /// Parse a path that must carry its own project segment.
    pub fn parse(raw: &str) -> Result<Self> {
        let segments = split_segments(raw)?;
        Self::from_segments(raw, segments)
    }

    /// Resolve `raw` against an optional explicit project.
    ///
    /// With a project, a path that already starts with that project is taken
    /// as is; anything else is placed inside the project.
    pub fn resolve(project: Option<&str>, raw: &str) -> Result<Self> {
        let Some(project) = project else {
            return Self::parse(raw);
        };
        validate_segment(project, project)?;
        let mut segments = split_segments(raw)?;
        if segments.len() < 2 || segments[0] != project {
            segments.insert(0, project.to_string());
        }
        Self::from_segments(raw, segments)
    }

    fn from_segments(raw: &str, segments: Vec<String>) -> Result<Self> {
        if segments.len() < 2 {
            return Err(Error::invalid_path(
                raw,
                "missing project segment (expected 'project/file')",
            ));
        }
        Ok(Self { segments })
    }

    /// Build a task path from a file below the store root.
    pub fn from_relative_fs(relative: &Path) -> Result<Self> {
        let raw = relative_to_string(relative);
        Self::parse(&raw)
    }

    pub fn project(&self) -> &str {
        &self.segments[0]
    }

    pub fn file_name(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segments of the folder holding this document.
    /// Whether the file name carries the card extension.
    pub fn is_card(&self) -> bool {
        is_card_name(self.file_name())
    }

    pub fn parent_segments(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    pub fn starts_with(&self, prefix: &PathPrefix) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Location of the document under `root`.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.segments);
        path
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl FromStr for TaskPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TaskPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A folder-level scope: a project, or a folder inside one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPrefix {
    segments: Vec<String>,
}

impl PathPrefix {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.strip_suffix(SEPARATOR).unwrap_or(raw);
        let segments = split_segments(trimmed)?;
        Ok(Self { segments })
    }

    /// Resolve a subpath against an optional project, mirroring
    /// [`TaskPath::resolve`]. Returns `None` when both are absent.
    pub fn resolve(project: Option<&str>, subpath: Option<&str>) -> Result<Option<Self>> {
        let subpath = subpath.filter(|value| !value.is_empty());
        match (project, subpath) {
            (None, None) => Ok(None),
            (None, Some(subpath)) => Self::parse(subpath).map(Some),
            (Some(project), None) => Self::parse(project).and_then(|prefix| {
                if prefix.segments.len() != 1 {
                    return Err(Error::invalid_path(project, "project must be a single segment"));
                }
                Ok(Some(prefix))
            }),
            (Some(project), Some(subpath)) => {
                validate_segment(project, project)?;
                let mut prefix = Self::parse(subpath)?;
                if prefix.segments[0] != project {
                    prefix.segments.insert(0, project.to_string());
                }
                Ok(Some(prefix))
            }
        }
    }

    pub fn project(&self) -> &str {
        &self.segments[0]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_project(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.segments);
        path
    }
}

impl fmt::Display for PathPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Validate a single project name.
pub fn validate_project(name: &str) -> Result<()> {
    validate_segment(name, name)
}

/// Whether a file or folder name is reserved for store internals.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// `true` for `name.md`; other files in the store are not cards.
pub fn is_card_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == CARD_EXTENSION)
}

fn split_segments(raw: &str) -> Result<Vec<String>> {
    if raw.is_empty() {
        return Err(Error::invalid_path(raw, "path is empty"));
    }
    if raw.starts_with(SEPARATOR) {
        return Err(Error::invalid_path(raw, "path must be relative"));
    }
    raw.split(SEPARATOR)
        .map(|segment| {
            validate_segment(raw, segment)?;
            Ok(segment.to_string())
        })
        .collect()
}

fn validate_segment(raw: &str, segment: &str) -> Result<()> {
    let reason = if segment.is_empty() {
        "empty path segment"
    } else if segment == "." || segment == ".." {
        "'.' and '..' segments are not allowed"
    } else if is_hidden_name(segment) {
        "segments starting with '.' are reserved"
    } else if segment.contains('\\') {
        "use '/' as the path separator"
    } else if segment.contains(SEPARATOR) {
        "segment cannot contain '/'"
    } else if segment.chars().any(char::is_control) {
        "control characters are not allowed"
    } else {
        return Ok(());
    };
    Err(Error::invalid_path(raw, reason))
}

fn relative_to_string(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_requires_project_segment() {
        let err = TaskPath::parse("task.md").unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
        assert!(err.to_string().contains("missing project segment"));

        let path = TaskPath::parse("proj/sub/task.md").unwrap();
        assert_eq!(path.project(), "proj");
        assert_eq!(path.file_name(), "task.md");
        assert_eq!(path.parent_segments(), ["proj", "sub"]);
        assert_eq!(path.to_string(), "proj/sub/task.md");
    }

    #[test]
    fn parse_rejects_illegal_segments() {
        for raw in [
            "",
            "/proj/a.md",
            "proj//a.md",
            "proj/a.md/",
            "proj/../a.md",
            "proj/./a.md",
            "proj/.hidden.md",
            "proj\\sub/a.md",
            "proj/a\u{0}.md",
        ] {
            assert!(
                matches!(TaskPath::parse(raw), Err(Error::InvalidPath { .. })),
                "expected rejection for {raw:?}"
            );
        }
    }

    #[test]
    fn paths_are_case_sensitive() {
        let lower = TaskPath::parse("proj/a.md").unwrap();
        let upper = TaskPath::parse("Proj/a.md").unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn resolve_with_project() {
        let prefixed = TaskPath::resolve(Some("web"), "ui/nav.md").unwrap();
        assert_eq!(prefixed.to_string(), "web/ui/nav.md");

        let already = TaskPath::resolve(Some("web"), "web/nav.md").unwrap();
        assert_eq!(already.to_string(), "web/nav.md");

        let bare = TaskPath::resolve(Some("web"), "nav.md").unwrap();
        assert_eq!(bare.to_string(), "web/nav.md");

        assert!(TaskPath::resolve(None, "nav.md").is_err());
        assert!(TaskPath::resolve(Some("../x"), "nav.md").is_err());
    }

    #[test]
    fn ordering_is_segment_wise() {
        let mut paths = vec![
            TaskPath::parse("a/b-c.md").unwrap(),
            TaskPath::parse("a/b/c.md").unwrap(),
            TaskPath::parse("a-b/c.md").unwrap(),
        ];
        paths.sort();
        let rendered: Vec<String> = paths.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["a/b/c.md", "a/b-c.md", "a-b/c.md"]);
    }

    #[test]
    fn prefix_resolution() {
        assert_eq!(PathPrefix::resolve(None, None).unwrap(), None);
        assert_eq!(PathPrefix::resolve(None, Some("")).unwrap(), None);

        let project = PathPrefix::resolve(Some("proj"), None).unwrap().unwrap();
        assert!(project.is_project());

        let nested = PathPrefix::resolve(Some("proj"), Some("sub/")).unwrap().unwrap();
        assert_eq!(nested.to_string(), "proj/sub");

        let explicit = PathPrefix::resolve(None, Some("proj/sub")).unwrap().unwrap();
        assert_eq!(explicit.project(), "proj");

        let path = TaskPath::parse("proj/sub/a.md").unwrap();
        assert!(path.starts_with(&explicit));
        assert!(!TaskPath::parse("proj/subway/a.md").unwrap().starts_with(&explicit));
    }

    #[test]
    fn only_md_files_are_cards() {
        assert!(TaskPath::parse("proj/a.md").unwrap().is_card());
        assert!(TaskPath::parse("proj/notes.v2.md").unwrap().is_card());
        assert!(!TaskPath::parse("proj/README.txt").unwrap().is_card());
        assert!(!TaskPath::parse("proj/a.md~").unwrap().is_card());
        assert!(!TaskPath::parse("proj/a.MD").unwrap().is_card());
        assert!(!TaskPath::parse("proj/Makefile").unwrap().is_card());
    }

    #[test]
    fn from_relative_fs_uses_forward_slashes() {
        let relative: PathBuf = ["proj", "sub", "a.md"].iter().collect();
        let path = TaskPath::from_relative_fs(&relative).unwrap();
        assert_eq!(path.to_string(), "proj/sub/a.md");
    }
}
