//! On-disk format of a task card.
//!
//! ```text
//! +++
//! title = "Auth"
//! status = "open"
//! priority = "medium"
//! tags = ["backend"]
//! created = "2026-10-19T10:00:00.123456789Z"
//! updated = "2026-10-19T10:00:00.123456789Z"
//! +++
//! free text body, stored verbatim
//! ```
//!
//! New cards get a TOML header. Cards written by other front-matter tools
//! with a YAML header fenced by `---` are read too, and keep that dialect
//! when rewritten; the YAML header is followed by one blank line. Keys other
//! than the six above are carried through programmatic writes untouched.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{normalize_tag, Priority, Status, TaskRecord};
use crate::path::TaskPath;

/// TOML header fence line.
pub const FENCE: &str = "+++";

/// YAML header fence line.
pub const YAML_FENCE: &str = "---";

const KNOWN_KEYS: [&str; 6] = ["title", "status", "priority", "tags", "created", "updated"];

/// Header keys this crate does not own, in the dialect the card was read in.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraKeys {
    Toml(toml::Table),
    Yaml(serde_yaml::Mapping),
}

impl Default for ExtraKeys {
    fn default() -> Self {
        ExtraKeys::Toml(toml::Table::new())
    }
}

#[derive(Serialize)]
struct Header<'a, E: Serialize> {
    title: &'a str,
    status: Status,
    priority: Priority,
    tags: &'a BTreeSet<String>,
    created: String,
    updated: String,
    #[serde(flatten)]
    extra: &'a E,
}

impl<'a, E: Serialize> Header<'a, E> {
    fn new(record: &'a TaskRecord, extra: &'a E) -> Self {
        Self {
            title: &record.title,
            status: record.status,
            priority: record.priority,
            tags: &record.tags,
            created: format_timestamp(record.created),
            updated: format_timestamp(record.updated),
            extra,
        }
    }
}

/// Render a record into its file representation.
pub fn render(record: &TaskRecord) -> Result<String> {
    match &record.extra {
        ExtraKeys::Toml(extra) => {
            let mut extra = extra.clone();
            for key in KNOWN_KEYS {
                extra.remove(key);
            }
            let header = toml::to_string(&Header::new(record, &extra))?;
            Ok(fenced(FENCE, &header, "", &record.content))
        }
        ExtraKeys::Yaml(extra) => {
            let mut extra = extra.clone();
            for key in KNOWN_KEYS {
                extra.remove(key);
            }
            let header = serde_yaml::to_string(&Header::new(record, &extra))?;
            Ok(fenced(YAML_FENCE, &header, "\n", &record.content))
        }
    }
}

fn fenced(fence: &str, header: &str, separator: &str, content: &str) -> String {
    let mut out = String::with_capacity(header.len() + content.len() + 10);
    out.push_str(fence);
    out.push('\n');
    out.push_str(header);
    if !header.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(fence);
    out.push('\n');
    out.push_str(separator);
    out.push_str(content);
    out
}

/// Parse a file's text into a record.
///
/// `fallback_time` stands in for missing timestamps (callers pass the file
/// modification time). A file without a header becomes a card whose content
/// is the whole file and whose title is the file stem.
pub fn parse(path: &TaskPath, text: &str, fallback_time: DateTime<Utc>) -> Result<TaskRecord> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let (mut known, extra, content) = match split_header(text) {
        Some((FENCE, header, body)) => {
            let mut table: toml::Table = header
                .parse()
                .map_err(|err: toml::de::Error| invalid(path, err.message()))?;
            let mut known = toml::Table::new();
            for key in KNOWN_KEYS {
                if let Some(value) = table.remove(key) {
                    known.insert(key.to_string(), value);
                }
            }
            (known, ExtraKeys::Toml(table), body.to_string())
        }
        Some((_, header, body)) => {
            let (known, mapping) = parse_yaml_header(path, header)?;
            let body = body
                .strip_prefix("\r\n")
                .or_else(|| body.strip_prefix('\n'))
                .unwrap_or(body);
            (known, ExtraKeys::Yaml(mapping), body.to_string())
        }
        None => (toml::Table::new(), ExtraKeys::default(), text.to_string()),
    };

    let title = match known.remove("title") {
        Some(toml::Value::String(title)) if !title.trim().is_empty() => title,
        Some(toml::Value::String(_)) | None => default_title(path),
        Some(other) => return Err(invalid(path, format!("title must be a string, got {other}"))),
    };
    let status = match known.remove("status") {
        Some(toml::Value::String(raw)) => raw
            .parse::<Status>()
            .map_err(|err| invalid(path, err.to_string()))?,
        Some(other) => return Err(invalid(path, format!("status must be a string, got {other}"))),
        None => Status::default(),
    };
    let priority = match known.remove("priority") {
        Some(toml::Value::String(raw)) => raw
            .parse::<Priority>()
            .map_err(|err| invalid(path, err.to_string()))?,
        Some(other) => {
            return Err(invalid(path, format!("priority must be a string, got {other}")))
        }
        None => Priority::default(),
    };
    let tags = parse_tags(path, known.remove("tags"))?;
    let created = parse_time_value(path, "created", known.remove("created"))?.unwrap_or(fallback_time);
    let updated = parse_time_value(path, "updated", known.remove("updated"))?.unwrap_or(fallback_time);

    Ok(TaskRecord {
        path: path.clone(),
        title,
        content,
        status,
        priority,
        tags,
        created,
        updated: updated.max(created),
        extra,
    })
}

/// Split a YAML header into the keys this crate owns and the rest.
///
/// Owned values are converted to TOML values so both dialects share one
/// validation path; a YAML `null` counts as absent.
fn parse_yaml_header(path: &TaskPath, header: &str) -> Result<(toml::Table, serde_yaml::Mapping)> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(header).map_err(|err| invalid(path, err.to_string()))?;
    let mut mapping = match value {
        serde_yaml::Value::Mapping(mapping) => mapping,
        serde_yaml::Value::Null => serde_yaml::Mapping::new(),
        _ => return Err(invalid(path, "YAML header must be a mapping")),
    };

    let mut known = toml::Table::new();
    for key in KNOWN_KEYS {
        match mapping.remove(key) {
            None | Some(serde_yaml::Value::Null) => {}
            Some(value) => {
                let value = toml::Value::try_from(&value)
                    .map_err(|err| invalid(path, format!("{key}: {err}")))?;
                known.insert(key.to_string(), value);
            }
        }
    }
    Ok((known, mapping))
}

/// Split `text` into `(fence, header, body)` when it opens with a fence line.
fn split_header(text: &str) -> Option<(&'static str, &str, &str)> {
    let (first, rest) = text.split_once('\n')?;
    let fence = match first.trim_end_matches('\r') {
        FENCE => FENCE,
        YAML_FENCE => YAML_FENCE,
        _ => return None,
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == fence {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((fence, header, body));
        }
        offset += line.len();
    }
    None
}

fn parse_tags(path: &TaskPath, value: Option<toml::Value>) -> Result<BTreeSet<String>> {
    let raw: Vec<String> = match value {
        None => Vec::new(),
        Some(toml::Value::String(tag)) => vec![tag],
        Some(toml::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                toml::Value::String(tag) => Ok(tag),
                other => Err(invalid(path, format!("tags must be strings, got {other}"))),
            })
            .collect::<Result<_>>()?,
        Some(other) => return Err(invalid(path, format!("tags must be a list, got {other}"))),
    };
    raw.iter()
        .map(|tag| normalize_tag(tag).map_err(|err| invalid(path, err.to_string())))
        .collect()
}

fn parse_time_value(
    path: &TaskPath,
    key: &str,
    value: Option<toml::Value>,
) -> Result<Option<DateTime<Utc>>> {
    let raw = match value {
        None => return Ok(None),
        Some(toml::Value::String(raw)) => raw,
        Some(toml::Value::Datetime(datetime)) => datetime.to_string(),
        Some(other) => return Err(invalid(path, format!("{key} must be a timestamp, got {other}"))),
    };
    parse_timestamp(&raw)
        .map(Some)
        .ok_or_else(|| invalid(path, format!("{key} is not a valid timestamp: '{raw}'")))
}

/// Parse RFC 3339; naive date-times and bare dates are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn default_title(path: &TaskPath) -> String {
    let name = path.file_name();
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

fn invalid(path: &TaskPath, reason: impl Into<String>) -> Error {
    Error::InvalidDocument {
        path: path.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::normalize_tags;

    fn sample() -> TaskRecord {
        let created = parse_timestamp("2026-10-19T10:00:00.123456789Z").unwrap();
        TaskRecord {
            path: TaskPath::parse("proj/x.md").unwrap(),
            title: "Auth \"flow\"".to_string(),
            content: "token check token\n\n+++ not a fence\n".to_string(),
            status: Status::InProgress,
            priority: Priority::High,
            tags: normalize_tags(["backend", "security"]).unwrap(),
            created,
            updated: created,
            extra: ExtraKeys::default(),
        }
    }

    #[test]
    fn render_then_parse_is_lossless() {
        let record = sample();
        let text = render(&record).unwrap();
        assert!(text.starts_with("+++\ntitle = "));
        assert!(text.contains("status = \"in-progress\""));
        assert!(text.ends_with("token check token\n\n+++ not a fence\n"));

        let parsed = parse(&record.path, &text, Utc::now()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn unknown_keys_survive_a_rewrite() {
        let text = "+++\ntitle = \"A\"\nowner = \"sam\"\n\n[links]\nissue = 42\n+++\nbody";
        let path = TaskPath::parse("proj/a.md").unwrap();
        let parsed = parse(&path, text, Utc::now()).unwrap();
        let ExtraKeys::Toml(extra) = &parsed.extra else {
            panic!("expected a TOML header");
        };
        assert_eq!(extra.get("owner").and_then(|v| v.as_str()), Some("sam"));

        let rendered = render(&parsed).unwrap();
        let reparsed = parse(&path, &rendered, Utc::now()).unwrap();
        assert_eq!(reparsed.extra, parsed.extra);
        assert_eq!(reparsed.content, "body");
    }

    #[test]
    fn hand_written_header_is_accepted() {
        let text = "+++\r\ntitle = \"Deploy\"\nstatus = \"Blocked\"\ntags = \"Ops\"\ncreated = 2026-01-02T03:04:05Z\nupdated = \"2026-01-03T00:00:00\"\n+++\r\nship it";
        let path = TaskPath::parse("ops/deploy.md").unwrap();
        let parsed = parse(&path, text, Utc::now()).unwrap();
        assert_eq!(parsed.status, Status::Blocked);
        assert_eq!(parsed.priority, Priority::Medium);
        assert!(parsed.has_tag("ops"));
        assert_eq!(format_timestamp(parsed.created), "2026-01-02T03:04:05Z");
        assert_eq!(format_timestamp(parsed.updated), "2026-01-03T00:00:00Z");
        assert_eq!(parsed.content, "ship it");
    }

    #[test]
    fn yaml_header_is_read_and_written_back_as_yaml() {
        let text = "---\ntitle: Auth\nstatus: done\npriority: high\ntags:\n- Backend\ncreated: '2026-01-02T03:04:05.123456'\nowner: sam\n---\n\ntoken check token\n";
        let path = TaskPath::parse("proj/auth.md").unwrap();
        let parsed = parse(&path, text, Utc::now()).unwrap();
        assert_eq!(parsed.title, "Auth");
        assert_eq!(parsed.status, Status::Done);
        assert_eq!(parsed.priority, Priority::High);
        assert!(parsed.has_tag("backend"));
        assert_eq!(format_timestamp(parsed.created), "2026-01-02T03:04:05.123456Z");
        assert_eq!(parsed.content, "token check token\n");
        let ExtraKeys::Yaml(extra) = &parsed.extra else {
            panic!("expected a YAML header");
        };
        assert_eq!(extra.get("owner").and_then(|v| v.as_str()), Some("sam"));

        let rendered = render(&parsed).unwrap();
        assert!(rendered.starts_with("---\n"));
        assert!(rendered.contains("status: done"));
        assert!(rendered.ends_with("\n---\n\ntoken check token\n"));
        assert!(!rendered.contains(FENCE));

        let reparsed = parse(&path, &rendered, Utc::now()).unwrap();
        assert_eq!(reparsed, parsed);
    }

    #[test]
    fn yaml_nulls_are_absent_and_scalars_are_rejected() {
        let path = TaskPath::parse("proj/a.md").unwrap();
        let parsed = parse(&path, "---\ntitle: A\ntags:\n---\nbody", Utc::now()).unwrap();
        assert!(parsed.tags.is_empty());
        assert_eq!(parsed.content, "body");

        let err = parse(&path, "---\njust a sentence\n---\n", Utc::now()).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));

        let err = parse(&path, "---\nstatus: someday\n---\n", Utc::now()).unwrap_err();
        assert!(err.to_string().contains("someday"));
    }

    #[test]
    fn missing_header_uses_stem_and_fallback_time() {
        let path = TaskPath::parse("notes/readme.md").unwrap();
        let fallback = parse_timestamp("2026-05-05").unwrap();
        let parsed = parse(&path, "just text", fallback).unwrap();
        assert_eq!(parsed.title, "readme");
        assert_eq!(parsed.content, "just text");
        assert_eq!(parsed.created, fallback);
        assert_eq!(parsed.updated, fallback);
    }

    #[test]
    fn invalid_metadata_in_file_is_reported() {
        let path = TaskPath::parse("proj/a.md").unwrap();
        let err = parse(&path, "+++\nstatus = \"someday\"\n+++\n", Utc::now()).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
        assert!(err.to_string().contains("someday"));

        let err = parse(&path, "+++\ntitle = [1\n+++\n", Utc::now()).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
    }
}
