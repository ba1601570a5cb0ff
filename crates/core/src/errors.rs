//! Per-field error bookkeeping for the wizard.
//!
//! [`ErrorMap`] maps dot-separated field paths (`title`, `location.city`,
//! `speakers.0.name`) to human-readable messages. [`TouchedFields`] records
//! which paths the user has interacted with, which decides whether an error
//! is shown.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::schema::Issue;

/// Whether `prefix` equals `path` or is a dot-delimited ancestor of it.
pub fn is_path_prefix(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

/// Whether two paths overlap: one equals, contains, or is nested in the other.
pub fn path_touches(path: &str, field: &str) -> bool {
    is_path_prefix(field, path) || is_path_prefix(path, field)
}

// ---------------------------------------------------------------------------
// ErrorMap
// ---------------------------------------------------------------------------

/// Field path → message. Absence of a key means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, String>);

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from an ordered issue list. The first message for a path wins.
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Self {
        let mut map = Self::new();
        for issue in issues {
            map.insert_if_absent(&issue.path, &issue.message);
        }
        map
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.insert(path.into(), message.into());
    }

    /// Record `message` for `path` unless an earlier rule already did.
    pub fn insert_if_absent(&mut self, path: &str, message: &str) {
        if !self.0.contains_key(path) {
            self.0.insert(path.to_string(), message.to_string());
        }
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.0.remove(path)
    }

    /// Drop every key overlapping `path` (the path itself, its ancestors and
    /// its descendants).
    pub fn remove_touching(&mut self, path: &str) {
        self.0.retain(|key, _| !path_touches(key, path));
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|key, _| keep(key));
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether any key satisfies `owned`.
    pub fn any(&self, mut owned: impl FnMut(&str) -> bool) -> bool {
        self.0.keys().any(|k| owned(k))
    }

    /// Replace exactly the keys selected by `owned` with `fresh`.
    ///
    /// Owned keys missing from `fresh` are deleted; keys not selected by
    /// `owned` are left untouched. Entries of `fresh` outside `owned` are
    /// ignored.
    pub fn merge_owned(&mut self, owned: impl Fn(&str) -> bool, fresh: ErrorMap) {
        self.0.retain(|key, _| !owned(key));
        for (key, message) in fresh.0 {
            if owned(&key) {
                self.0.insert(key, message);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TouchedFields
// ---------------------------------------------------------------------------

/// Paths the user has blurred or attempted to submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TouchedFields(BTreeSet<String>);

impl TouchedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&mut self, path: &str) {
        if !self.0.contains(path) {
            self.0.insert(path.to_string());
        }
    }

    /// A path counts as touched when it, one of its ancestors, or one of its
    /// descendants was touched. Container errors such as `location` surface
    /// when the user leaves `location.city`.
    pub fn is_touched(&self, path: &str) -> bool {
        self.0.iter().any(|t| path_touches(t, path))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
