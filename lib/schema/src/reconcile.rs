//! Schema Reconciler
//!
//! Left-joins the per-entity record sets on the identifier column and then
//! selects the tabular feature block, either from the authoritative
//! [`FeatureSchema`] or, in degraded mode, from the numeric columns of the
//! merged table.

use crate::filter::EntityRecordSet;
use crate::schema::FeatureSchema;
use ahash::AHashSet;
use pymescore_core::{CellValue, Error, RawTable, Result, SchemaMode};
use tracing::{debug, warn};

const LEFT_SUFFIX: &str = "_x";
const RIGHT_SUFFIX: &str = "_y";

/// The merged rows of one entity. Row count equals the primary record count.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledTable {
    key: String,
    identifier_column: String,
    table: RawTable,
}

impl ReconciledTable {
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn identifier_column(&self) -> &str {
        &self.identifier_column
    }

    #[inline]
    pub fn table(&self) -> &RawTable {
        &self.table
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Add `column` filled with missing values if it is not present
    pub fn ensure_column(&mut self, column: &str) {
        if !self.table.has_column(column) {
            debug!(column, "adding missing column");
            self.table.add_column(column, CellValue::Missing);
        }
    }

    /// Free text per row. Missing and non-text cells become the empty string.
    pub fn text_values(&self, column: &str) -> Vec<String> {
        match self.table.column_index(column) {
            Some(col) => self
                .table
                .rows()
                .iter()
                .map(|r| r[col].as_str().unwrap_or_default().to_string())
                .collect(),
            None => vec![String::new(); self.table.len()],
        }
    }
}

/// Left-join `auxiliaries` onto `primary`, one after another, on the
/// identifier column. Overlapping non-key columns are suffixed `_x`/`_y`.
pub fn merge(primary: EntityRecordSet, auxiliaries: &[EntityRecordSet]) -> Result<ReconciledTable> {
    let key = primary.key().to_string();
    let on = primary.kind().identifier_column();
    let mut table = primary.into_table();

    for aux in auxiliaries {
        if aux.kind().identifier_column() != on {
            return Err(Error::Schema(format!(
                "cannot join {} on '{}': its identifier column is '{}'",
                aux.kind(),
                on,
                aux.kind().identifier_column()
            )));
        }
        if aux.is_empty() {
            debug!(source = aux.kind().label(), "no auxiliary rows, filling as missing");
        }
        table = left_join(&table, aux.table(), on)?;
    }

    Ok(ReconciledTable {
        key,
        identifier_column: on.to_string(),
        table,
    })
}

fn left_join(left: &RawTable, right: &RawTable, on: &str) -> Result<RawTable> {
    let left_key = left
        .column_index(on)
        .ok_or_else(|| Error::Schema(format!("left table has no '{}' column", on)))?;
    let right_key = right
        .column_index(on)
        .ok_or_else(|| Error::Schema(format!("right table has no '{}' column", on)))?;

    let right_cols: Vec<usize> = (0..right.width()).filter(|&i| i != right_key).collect();
    let overlap: AHashSet<&str> = right_cols
        .iter()
        .map(|&i| right.columns()[i].as_str())
        .filter(|name| left.has_column(name))
        .collect();

    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .map(|c| {
            if overlap.contains(c.as_str()) {
                format!("{}{}", c, LEFT_SUFFIX)
            } else {
                c.clone()
            }
        })
        .collect();
    columns.extend(right_cols.iter().map(|&i| {
        let c = &right.columns()[i];
        if overlap.contains(c.as_str()) {
            format!("{}{}", c, RIGHT_SUFFIX)
        } else {
            c.clone()
        }
    }));

    let mut out = RawTable::new(columns);
    for left_row in left.rows() {
        let mut matched = false;
        for right_row in right.rows() {
            if right_row[right_key] != left_row[left_key] {
                continue;
            }
            matched = true;
            let mut row = left_row.clone();
            row.extend(right_cols.iter().map(|&i| right_row[i].clone()));
            out.push_row(row)?;
        }
        if !matched {
            let mut row = left_row.clone();
            row.resize(left_row.len() + right_cols.len(), CellValue::Missing);
            out.push_row(row)?;
        }
    }
    Ok(out)
}

/// The tabular block of the feature matrix: one row of numbers per reconciled row
#[derive(Debug, Clone, PartialEq)]
pub struct TabularBlock {
    pub mode: SchemaMode,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl TabularBlock {
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Resolves the tabular feature columns of a reconciled table
#[derive(Debug, Clone)]
pub struct SchemaResolver<'a> {
    schema: Option<&'a FeatureSchema>,
    text_column: &'a str,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(schema: Option<&'a FeatureSchema>, text_column: &'a str) -> Self {
        Self {
            schema,
            text_column,
        }
    }

    pub fn mode(&self) -> SchemaMode {
        if self.schema.is_some() {
            SchemaMode::Authoritative
        } else {
            SchemaMode::Degraded
        }
    }

    pub fn resolve(&self, reconciled: &ReconciledTable) -> TabularBlock {
        match self.schema {
            Some(schema) => Self::authoritative(schema, reconciled.table()),
            None => self.degraded(reconciled),
        }
    }

    /// Exactly the declared columns in the declared order. Absent columns
    /// read as zero, as does any missing or non-numeric cell.
    fn authoritative(schema: &FeatureSchema, table: &RawTable) -> TabularBlock {
        let indices: Vec<Option<usize>> = schema
            .columns()
            .iter()
            .map(|c| table.column_index(c))
            .collect();

        let synthesized = indices.iter().filter(|i| i.is_none()).count();
        if synthesized > 0 {
            debug!(synthesized, "schema columns absent from upload, filled with zero");
        }

        TabularBlock {
            mode: SchemaMode::Authoritative,
            columns: schema.columns().to_vec(),
            rows: project(table, &indices),
        }
    }

    /// Every numeric column except the identifier and text columns, in table order
    fn degraded(&self, reconciled: &ReconciledTable) -> TabularBlock {
        let table = reconciled.table();
        let columns: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| {
                c.as_str() != reconciled.identifier_column()
                    && c.as_str() != self.text_column
                    && table.is_numeric_column(c)
            })
            .cloned()
            .collect();

        warn!(
            key = reconciled.key(),
            columns = columns.len(),
            "no feature schema loaded, inferring tabular columns (degraded mode)"
        );

        let indices: Vec<Option<usize>> = columns.iter().map(|c| table.column_index(c)).collect();
        TabularBlock {
            mode: SchemaMode::Degraded,
            rows: project(table, &indices),
            columns,
        }
    }
}

fn project(table: &RawTable, indices: &[Option<usize>]) -> Vec<Vec<f64>> {
    table
        .rows()
        .iter()
        .map(|row| {
            indices
                .iter()
                .map(|idx| idx.and_then(|i| row[i].as_f64()).unwrap_or(0.0))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::EntityFilter;
    use pymescore_core::SourceKind;

    const RUC: &str = "0912345678";

    fn primary() -> EntityRecordSet {
        let mut t = RawTable::new(["ruc", "activos", "texto_financiero", "monto"]);
        t.push_row(vec![RUC.into(), 10.0.into(), "sube".into(), 1.0.into()]).unwrap();
        t.push_row(vec![RUC.into(), 20.0.into(), CellValue::Missing, 2.0.into()]).unwrap();
        t.push_row(vec![RUC.into(), 30.0.into(), "baja".into(), 3.0.into()]).unwrap();
        EntityFilter::new(SourceKind::Balances, RUC).apply(&t)
    }

    fn references(rows: &[(&str, f64)]) -> EntityRecordSet {
        let mut t = RawTable::new(["ruc", "monto", "calificacion"]);
        for (ruc, monto) in rows {
            t.push_row(vec![(*ruc).into(), (*monto).into(), 5.0.into()]).unwrap();
        }
        EntityFilter::new(SourceKind::References, RUC).apply(&t)
    }

    #[test]
    fn test_merge_without_auxiliary_matches_keeps_primary_rows() {
        let refs = references(&[("1790000000", 9.0)]);
        let digital = EntityFilter::new(SourceKind::DigitalData, RUC)
            .apply(&RawTable::new(["ruc", "seguidores"]));
        let merged = merge(primary(), &[refs, digital]).unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(
            merged.table().columns(),
            &["ruc", "activos", "texto_financiero", "monto_x", "monto_y", "calificacion", "seguidores"]
        );
        for i in 0..3 {
            assert_eq!(merged.table().cell(i, "calificacion"), Some(&CellValue::Missing));
            assert_eq!(merged.table().cell(i, "seguidores"), Some(&CellValue::Missing));
        }
    }

    #[test]
    fn test_merge_with_single_match_broadcasts() {
        let merged = merge(primary(), &[references(&[(RUC, 7.0)])]).unwrap();
        assert_eq!(merged.len(), 3);
        for i in 0..3 {
            assert_eq!(merged.table().cell(i, "monto_y"), Some(&CellValue::Number(7.0)));
        }
        assert_eq!(merged.table().cell(2, "monto_x"), Some(&CellValue::Number(3.0)));
    }

    #[test]
    fn test_merge_rejects_mismatched_identifier() {
        let comments = EntityFilter::new(SourceKind::Comments, "Acme")
            .apply(&RawTable::new(["empresa", "texto"]));
        assert!(matches!(merge(primary(), &[comments]), Err(Error::Schema(_))));
    }

    #[test]
    fn test_authoritative_schema_fills_missing_with_zero() {
        let mut t = RawTable::new(["ruc", "a", "c"]);
        t.push_row(vec![RUC.into(), 1.5.into(), 3.5.into()]).unwrap();
        let set = EntityFilter::new(SourceKind::Balances, RUC).apply(&t);
        let merged = merge(set, &[]).unwrap();

        let schema = FeatureSchema::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        let block = SchemaResolver::new(Some(&schema), "texto_financiero").resolve(&merged);
        assert_eq!(block.mode, SchemaMode::Authoritative);
        assert_eq!(block.columns, vec!["a", "b", "c"]);
        assert_eq!(block.rows, vec![vec![1.5, 0.0, 3.5]]);
    }

    #[test]
    fn test_authoritative_schema_zeroes_missing_and_text_cells() {
        let mut t = RawTable::new(["ruc", "a", "b"]);
        t.push_row(vec![RUC.into(), CellValue::Missing, "n/a".into()]).unwrap();
        let merged = merge(EntityFilter::new(SourceKind::Balances, RUC).apply(&t), &[]).unwrap();
        let schema = FeatureSchema::new(vec!["b".into(), "a".into()]).unwrap();
        let block = SchemaResolver::new(Some(&schema), "texto_financiero").resolve(&merged);
        assert_eq!(block.rows, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn test_degraded_mode_selects_numeric_columns() {
        let merged = merge(primary(), &[references(&[])]).unwrap();
        let resolver = SchemaResolver::new(None, "texto_financiero");
        assert_eq!(resolver.mode(), SchemaMode::Degraded);

        let block = resolver.resolve(&merged);
        assert_eq!(block.mode, SchemaMode::Degraded);
        assert_eq!(
            block.columns,
            vec!["activos", "monto_x", "monto_y", "calificacion"]
        );
        assert_eq!(block.len(), 3);
        assert_eq!(block.rows[1], vec![20.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_text_values_and_ensure_column() {
        let mut merged = merge(primary(), &[]).unwrap();
        assert_eq!(merged.text_values("texto_financiero"), vec!["sube", "", "baja"]);

        merged.ensure_column("comentario");
        assert!(merged.table().has_column("comentario"));
        assert_eq!(merged.text_values("comentario"), vec!["", "", ""]);
        assert_eq!(merged.text_values("does_not_exist").len(), 3);
    }
}
