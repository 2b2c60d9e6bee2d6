//! Keyword search over the task store.
//!
//! Scoring is plain term counting: every occurrence of a query token in the
//! title counts [`TITLE_WEIGHT`], every occurrence in the body counts
//! [`CONTENT_WEIGHT`]. Tokens are maximal runs of alphanumeric characters,
//! compared case-insensitively. There is no index; each query re-reads the
//! documents it needs.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use glob::MatchOptions;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{normalize_tags, Priority, Status, TaskRecord, TaskSummary};
use crate::path::{PathPrefix, TaskPath};
use crate::store::TaskStore;

pub const TITLE_WEIGHT: u32 = 3;
pub const CONTENT_WEIGHT: u32 = 1;

/// Characters of context kept on each side of a snippet's first match.
pub const DEFAULT_SNIPPET_RADIUS: usize = 100;

const ELLIPSIS: &str = "...";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// How a tag filter combines its tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatch {
    /// Every listed tag must be present
    #[default]
    All,
    /// At least one listed tag must be present
    Any,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub tag_match: TagMatch,
    pub path_pattern: Option<String>,
    pub max_results: usize,
    pub include_content: bool,
    pub snippet_radius: usize,
}

impl SearchQuery {
    pub fn new(max_results: usize) -> Self {
        Self {
            text: None,
            status: None,
            priority: None,
            tags: Vec::new(),
            tag_match: TagMatch::All,
            path_pattern: None,
            max_results,
            include_content: false,
            snippet_radius: DEFAULT_SNIPPET_RADIUS,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
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

    pub fn tag_match(mut self, tag_match: TagMatch) -> Self {
        self.tag_match = tag_match;
        self
    }

    pub fn path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.path_pattern = Some(pattern.into());
        self
    }

    pub fn include_content(mut self, include: bool) -> Self {
        self.include_content = include;
        self
    }

    pub fn snippet_radius(mut self, radius: usize) -> Self {
        self.snippet_radius = radius;
        self
    }
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub task: TaskSummary,
    /// Zero when the query had no text
    pub score: u32,
    /// Excerpt around the first body match; empty when there is none or the
    /// full content was requested
    #[serde(skip_serializing_if = "String::is_empty")]
    pub snippet: String,
}

/// Restriction on which paths a search may return.
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// No wildcard: the path must begin with these segments
    Prefix(PathPrefix),
    /// `*` within a segment, `**` across segments
    Glob(glob::Pattern),
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("path pattern is empty".to_string()));
        }
        if !trimmed.contains(['*', '?', '[']) {
            return PathPrefix::parse(trimmed).map(Self::Prefix);
        }

        let trimmed = trimmed.trim_end_matches('/');
        let normalized = if trimmed == "**" || trimmed.ends_with("/**") {
            format!("{trimmed}/*")
        } else {
            trimmed.to_string()
        };
        glob::Pattern::new(&normalized)
            .map(Self::Glob)
            .map_err(|err| Error::InvalidArgument(format!("invalid path pattern '{raw}': {err}")))
    }

    pub fn matches(&self, path: &TaskPath) -> bool {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix),
            Self::Glob(pattern) => pattern.matches_with(&path.to_string(), MATCH_OPTIONS),
        }
    }

    /// Subtree a scan can be limited to.
    fn scope(&self) -> Option<&PathPrefix> {
        match self {
            Self::Prefix(prefix) => Some(prefix),
            Self::Glob(_) => None,
        }
    }
}

/// Run `query` against every document in `store`.
///
/// Results are ordered by score (highest first), then most recently
/// updated, then path; the cap applies after ordering.
pub fn search(store: &TaskStore, query: &SearchQuery) -> Result<Vec<SearchHit>> {
    let pattern = query
        .path_pattern
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(PathPattern::parse)
        .transpose()?;
    let required_tags = normalize_tags(&query.tags)?;
    let tokens = query.text.as_deref().map(query_tokens).unwrap_or_default();

    if query.max_results == 0 {
        return Ok(Vec::new());
    }

    let mut matches: Vec<(u32, TaskRecord)> = Vec::new();
    for record in store.scan(pattern.as_ref().and_then(PathPattern::scope))? {
        if query.status.is_some_and(|status| record.status != status)
            || query.priority.is_some_and(|priority| record.priority != priority)
            || !tags_match(&record, &required_tags, query.tag_match)
            || pattern.as_ref().is_some_and(|p| !p.matches(&record.path))
        {
            continue;
        }

        let score = if tokens.is_empty() {
            0
        } else {
            match score_record(&record, &tokens) {
                0 => continue,
                score => score,
            }
        };
        matches.push((score, record));
    }

    matches.sort_by(|(a_score, a), (b_score, b)| rank(*a_score, a, *b_score, b));
    matches.truncate(query.max_results);

    tracing::debug!(hits = matches.len(), "search finished");
    Ok(matches
        .into_iter()
        .map(|(score, record)| {
            let (task, snippet) = if query.include_content {
                (record.summary_with_content(), String::new())
            } else {
                let snippet = extract_snippet(&record.content, &tokens, query.snippet_radius)
                    .unwrap_or_default();
                (record.summary(), snippet)
            };
            SearchHit {
                task,
                score,
                snippet,
            }
        })
        .collect())
}

fn rank(a_score: u32, a: &TaskRecord, b_score: u32, b: &TaskRecord) -> Ordering {
    b_score
        .cmp(&a_score)
        .then_with(|| b.updated.cmp(&a.updated))
        .then_with(|| a.path.cmp(&b.path))
}

fn tags_match(record: &TaskRecord, required: &BTreeSet<String>, mode: TagMatch) -> bool {
    if required.is_empty() {
        return true;
    }
    match mode {
        TagMatch::All => required.iter().all(|tag| record.has_tag(tag)),
        TagMatch::Any => required.iter().any(|tag| record.has_tag(tag)),
    }
}

/// Distinct lowercased tokens of a query string.
pub fn query_tokens(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().collect()
}

/// Lowercased alphanumeric runs of `text`, in order.
pub fn tokenize(text: &str) -> Vec<String> {
    word_spans(text)
        .into_iter()
        .map(|(start, end)| text[start..end].to_lowercase())
        .collect()
}

fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (idx, ch) in text.char_indices() {
        if ch.is_alphanumeric() {
            start.get_or_insert(idx);
        } else if let Some(begin) = start.take() {
            spans.push((begin, idx));
        }
    }
    if let Some(begin) = start {
        spans.push((begin, text.len()));
    }
    spans
}

fn token_counts(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Weighted occurrence count of `tokens` in a record.
pub fn score_record(record: &TaskRecord, tokens: &BTreeSet<String>) -> u32 {
    let title = token_counts(&record.title);
    let content = token_counts(&record.content);
    tokens
        .iter()
        .map(|token| {
            TITLE_WEIGHT * title.get(token).copied().unwrap_or(0)
                + CONTENT_WEIGHT * content.get(token).copied().unwrap_or(0)
        })
        .sum()
}

/// Excerpt of `content` around the first token match.
///
/// Keeps up to `radius` characters on each side and marks clipped ends with
/// `...`. Returns `None` when no token occurs in `content`.
pub fn extract_snippet(content: &str, tokens: &BTreeSet<String>, radius: usize) -> Option<String> {
    if tokens.is_empty() {
        return None;
    }
    let (start, end) = word_spans(content)
        .into_iter()
        .find(|&(start, end)| tokens.contains(&content[start..end].to_lowercase()))?;

    let from = if radius == 0 {
        start
    } else {
        content[..start]
            .char_indices()
            .rev()
            .nth(radius - 1)
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    };
    let to = content[end..]
        .char_indices()
        .nth(radius)
        .map(|(idx, _)| end + idx)
        .unwrap_or(content.len());

    let mut snippet = String::with_capacity(to - from + 2 * ELLIPSIS.len());
    if from > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.push_str(&content[from..to]);
    if to < content.len() {
        snippet.push_str(ELLIPSIS);
    }
    Some(snippet)
}
