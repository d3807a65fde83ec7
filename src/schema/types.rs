// src/schema/types.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic type of a declared column.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Nullable 64-bit integer; empty cells become NULL.
    Integer,
    Float,
    Text,
    Boolean,
    /// Naive timestamp, microsecond precision.
    Timestamp,
}

/// Declared column types for one dataset: column name → kind.
///
/// Columns of a delimited source that are not declared here are read as text,
/// so the destination schema never depends on sampling the data.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(transparent)]
pub struct SchemaDescriptor {
    columns: BTreeMap<String, ColumnKind>,
}

impl SchemaDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) `name` as `kind`.
    pub fn with(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.insert(name.into(), kind);
        self
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.get(name).copied()
    }

    pub fn timestamp_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|(_, kind)| **kind == ColumnKind::Timestamp)
            .map(|(name, _)| name.as_str())
    }

    /// Declared names that do not appear in `headers`.
    pub fn missing_from<'a>(&'a self, headers: &'a [String]) -> Vec<&'a str> {
        self.columns
            .keys()
            .filter(|name| !headers.iter().any(|h| h == *name))
            .map(String::as_str)
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, ColumnKind)> for SchemaDescriptor {
    fn from_iter<I: IntoIterator<Item = (S, ColumnKind)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(n, k)| (n.into(), k)).collect(),
        }
    }
}
