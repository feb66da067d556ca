//! The ordered path table.
//!
//! Entries are kept in match order. Inserting a concrete path splices it in
//! front of the first templated entry that would otherwise capture it, so a
//! first-match scan always prefers `/pets/mine` over `/pets/{pet}`. Templated
//! paths that differ only in placeholder names or letter case are rejected as
//! ambiguous, since matching ignores case;
//! structurally different templates that happen to match the same URL are
//! allowed and resolved by table order.

use super::path::RelativePath;
use super::types::PathItem;
use crate::error::GenerateError;
use crate::router::ParamVec;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone)]
pub struct PathEntry {
    pub path: RelativePath,
    pub item: PathItem,
}

#[derive(Debug, Clone, Default)]
pub struct PathTable {
    entries: Vec<PathEntry>,
}

impl PathTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: RelativePath, item: PathItem) -> Result<(), GenerateError> {
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.path.equals_structurally(&path))
        {
            return Err(GenerateError::AmbiguousPath {
                path: path.as_str().to_string(),
                existing: existing.path.as_str().to_string(),
            });
        }

        let position = if path.is_templated() {
            None
        } else {
            self.entries
                .iter()
                .position(|e| e.path.is_templated() && e.path.matches(path.as_str()).is_some())
        };
        let entry = PathEntry { path, item };
        match position {
            Some(index) => self.entries.insert(index, entry),
            None => self.entries.push(entry),
        }
        Ok(())
    }

    /// Builder form of [`PathTable::insert`].
    pub fn with(mut self, path: RelativePath, item: PathItem) -> Result<Self, GenerateError> {
        self.insert(path, item)?;
        Ok(self)
    }

    /// First entry matching `request_path`, with its extracted variables.
    #[must_use]
    pub fn match_path(&self, request_path: &str) -> Option<(&PathEntry, ParamVec)> {
        self.entries
            .iter()
            .find_map(|e| e.path.matches(request_path).map(|params| (e, params)))
    }

    #[must_use]
    pub fn get(&self, template: &str) -> Option<&PathEntry> {
        self.entries.iter().find(|e| e.path.as_str() == template)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PathTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(entry.path.as_str(), &entry.item)?;
        }
        map.end()
    }
}
