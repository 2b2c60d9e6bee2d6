//! Task card model: metadata enums, tag normalization, records and patches.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::document::ExtraKeys;
use crate::error::{Error, Result};
use crate::path::TaskPath;

/// Workflow status of a task card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Blocked,
    Done,
    Cancelled,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Open,
        Status::InProgress,
        Status::Blocked,
        Status::Done,
        Status::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in-progress",
            Status::Blocked => "blocked",
            Status::Done => "done",
            Status::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "in-progress" | "in_progress" => Ok(Status::InProgress),
            "blocked" => Ok(Status::Blocked),
            "done" => Ok(Status::Done),
            "cancelled" => Ok(Status::Cancelled),
            _ => Err(Error::invalid_metadata(
                "status",
                format!(
                    "'{s}' is not one of open, in-progress, blocked, done, cancelled"
                ),
            )),
        }
    }
}

/// Priority of a task card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(Error::invalid_metadata(
                "priority",
                format!("'{s}' is not one of low, medium, high, critical"),
            )),
        }
    }
}

/// Normalize one tag: trimmed, lowercased, no whitespace, commas or control
/// characters.
pub fn normalize_tag(raw: &str) -> Result<String> {
    let tag = raw.trim().to_lowercase();
    if tag.is_empty() {
        return Err(Error::invalid_metadata("tags", "tag cannot be empty"));
    }
    if tag
        .chars()
        .any(|ch| ch.is_whitespace() || ch.is_control() || ch == ',')
    {
        return Err(Error::invalid_metadata(
            "tags",
            format!("'{raw}' must not contain whitespace, commas or control characters"),
        ));
    }
    Ok(tag)
}

/// Normalize a list of tags into a set; duplicates collapse.
pub fn normalize_tags<I, S>(tags: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| normalize_tag(tag.as_ref()))
        .collect()
}

/// Titles are stored as given; blank or multi-line titles are rejected.
pub fn validate_title(title: &str) -> Result<String> {
    if title.trim().is_empty() {
        return Err(Error::invalid_metadata("title", "title cannot be empty"));
    }
    if title.chars().any(char::is_control) {
        return Err(Error::invalid_metadata(
            "title",
            "title must be a single line without control characters",
        ));
    }
    Ok(title.to_string())
}

/// Next `updated` value: now, but never at or before `previous`.
pub fn bump_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::nanoseconds(1)
    }
}

/// One task card as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub path: TaskPath,
    pub title: String,
    pub content: String,
    pub status: Status,
    pub priority: Priority,
    pub tags: BTreeSet<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Header keys this crate does not own; kept so hand edits survive writes.
    #[serde(skip)]
    pub extra: ExtraKeys,
}

impl TaskRecord {
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            path: self.path.clone(),
            title: self.title.clone(),
            status: self.status,
            priority: self.priority,
            tags: self.tags.clone(),
            created: self.created,
            updated: self.updated,
            content: None,
        }
    }

    pub fn summary_with_content(&self) -> TaskSummary {
        TaskSummary {
            content: Some(self.content.clone()),
            ..self.summary()
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Token-efficient view of a record: everything but the body unless asked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub path: TaskPath,
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    pub tags: BTreeSet<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Input for creating a task card.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub content: String,
    pub status: Status,
    pub priority: Priority,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update. Only provided fields change; tag deltas add then remove.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
}

impl TaskPatch {
    /// Apply the patch to `record` in memory, validating every field first.
    pub fn apply(&self, record: &mut TaskRecord) -> Result<()> {
        let title = self.title.as_deref().map(validate_title).transpose()?;
        let add = normalize_tags(&self.add_tags)?;
        let remove = normalize_tags(&self.remove_tags)?;

        if let Some(title) = title {
            record.title = title;
        }
        if let Some(content) = &self.content {
            record.content = content.clone();
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        record.tags.extend(add);
        record.tags.retain(|tag| !remove.contains(tag));
        Ok(())
    }
}
