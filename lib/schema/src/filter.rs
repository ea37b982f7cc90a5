//! Entity Filter
//!
//! Isolates the rows of one entity from a loaded table.

use pymescore_core::{CellValue, Error, RawTable, Result, SourceKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Rows of one source that belong to one entity, in upload order
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecordSet {
    kind: SourceKind,
    key: String,
    table: RawTable,
}

impl EntityRecordSet {
    #[inline]
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn table(&self) -> &RawTable {
        &self.table
    }

    #[inline]
    pub fn into_table(self) -> RawTable {
        self.table
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Fail with a client error when the set is empty.
    /// Only meaningful for the primary source.
    pub fn require_rows(self) -> Result<Self> {
        if self.is_empty() {
            return Err(Error::NoDataForEntity {
                source_name: self.kind.label().to_string(),
                key: self.key,
            });
        }
        Ok(self)
    }
}

/// What to do when an auxiliary source has several rows for the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the first row and log the rest as dropped
    #[default]
    KeepFirst,
    /// Fail the request
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-first" | "keep_first" | "first" => Ok(DuplicatePolicy::KeepFirst),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(format!("unknown duplicate policy '{}'", other)),
        }
    }
}

impl DuplicatePolicy {
    /// Enforce at most one row per entity. Without this a left join would
    /// multiply the primary rows by the number of auxiliary matches.
    pub fn apply(&self, set: EntityRecordSet) -> Result<EntityRecordSet> {
        let count = set.len();
        if count <= 1 {
            return Ok(set);
        }
        match self {
            DuplicatePolicy::Reject => Err(Error::DuplicateEntityRows {
                source_name: set.kind.label().to_string(),
                key: set.key,
                count,
            }),
            DuplicatePolicy::KeepFirst => {
                warn!(
                    source = set.kind.label(),
                    key = %set.key,
                    count,
                    "duplicate entity rows, keeping the first"
                );
                let mut seen = false;
                let table = set.table.filter_rows(|_| !std::mem::replace(&mut seen, true));
                Ok(EntityRecordSet { table, ..set })
            }
        }
    }
}

/// Equality filter on a source's identifier column
#[derive(Debug, Clone)]
pub struct EntityFilter {
    kind: SourceKind,
    key: String,
}

impl EntityFilter {
    pub fn new(kind: SourceKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into().trim().to_string(),
        }
    }

    /// Identifier cells are compared as text, so `0912345678` never matches `912345678`
    pub fn matches(&self, cell: &CellValue) -> bool {
        cell.as_str() == Some(self.key.as_str())
    }

    pub fn apply(&self, table: &RawTable) -> EntityRecordSet {
        let table = match table.column_index(self.kind.identifier_column()) {
            Some(col) => table.filter_rows(|row| self.matches(&row[col])),
            None => table.filter_rows(|_| false),
        };
        EntityRecordSet {
            kind: self.kind,
            key: self.key.clone(),
            table,
        }
    }
}
