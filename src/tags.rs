//! Tag aggregation across documents.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::path::{validate_project, PathPrefix};
use crate::store::TaskStore;

/// Every tag in use, optionally within one project.
///
/// An unknown project yields an empty set rather than an error.
pub fn all_tags(store: &TaskStore, project: Option<&str>) -> Result<BTreeSet<String>> {
    Ok(tag_counts(store, project)?.into_keys().collect())
}

/// Number of documents carrying each tag.
pub fn tag_counts(store: &TaskStore, project: Option<&str>) -> Result<BTreeMap<String, usize>> {
    let scope = match project {
        Some(name) => {
            validate_project(name)?;
            if !store.project_exists(name) {
                return Ok(BTreeMap::new());
            }
            Some(PathPrefix::parse(name)?)
        }
        None => None,
    };

    let mut counts = BTreeMap::new();
    for record in store.scan(scope.as_ref())? {
        for tag in record.tags {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }
    Ok(counts)
}
