//! In-memory tables parsed from uploaded files
//!
//! Columns keep their upload order. That order is the "natural" order used
//! when no authoritative feature schema is available.

use crate::error::{Error, Result};
use crate::value::CellValue;
use ahash::AHashMap;

/// An ordered set of rows sharing one header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    index: AHashMap<String, usize>,
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Create an empty table. Repeated header names get a `.N` suffix.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for name in columns {
            let name = name.into();
            let mut candidate = name.clone();
            let mut n = 1;
            while table.index.contains_key(&candidate) {
                candidate = format!("{}.{}", name, n);
                n += 1;
            }
            table.index.insert(candidate.clone(), table.columns.len());
            table.columns.push(candidate);
        }
        table
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[inline]
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidRowWidth {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Append a column filled with `fill`. No-op if the column exists.
    pub fn add_column(&mut self, name: impl Into<String>, fill: CellValue) {
        let name = name.into();
        if self.index.contains_key(&name) {
            return;
        }
        self.index.insert(name.clone(), self.columns.len());
        self.columns.push(name);
        for row in &mut self.rows {
            row.push(fill.clone());
        }
    }

    /// Rename a column in place, keeping its position
    pub fn rename_column(&mut self, from: &str, to: impl Into<String>) -> bool {
        let to = to.into();
        if self.index.contains_key(&to) {
            return false;
        }
        match self.index.remove(from) {
            Some(idx) => {
                self.columns[idx] = to.clone();
                self.index.insert(to, idx);
                true
            }
            None => false,
        }
    }

    /// Copy of this table with only the rows accepted by `keep`, order preserved
    pub fn filter_rows<F>(&self, mut keep: F) -> RawTable
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        RawTable {
            columns: self.columns.clone(),
            index: self.index.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// A column is numeric when every non-missing cell is a number.
    /// An all-missing column counts as numeric.
    pub fn is_numeric_column(&self, column: &str) -> bool {
        match self.column_index(column) {
            Some(col) => self
                .rows
                .iter()
                .all(|r| matches!(r[col], CellValue::Missing | CellValue::Number(_))),
            None => false,
        }
    }
}
