use crate::error::{Error, Result};

/// Row-major `[tabular | embedding]` feature matrix handed to the scoring model
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    tabular_width: usize,
    data: Vec<f64>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Empty matrix whose first `tabular_width` columns are the tabular block
    pub fn new(columns: Vec<String>, tabular_width: usize) -> Self {
        debug_assert!(tabular_width <= columns.len());
        Self {
            columns,
            tabular_width,
            data: Vec::new(),
            n_rows: 0,
        }
    }

    pub fn push_row(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidRowWidth {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        self.n_rows += 1;
        Ok(())
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn tabular_width(&self) -> usize {
        self.tabular_width
    }

    #[inline]
    pub fn embedding_width(&self) -> usize {
        self.columns.len() - self.tabular_width
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        let width = self.n_cols();
        if i >= self.n_rows {
            return None;
        }
        self.data.get(i * width..(i + 1) * width)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows).filter_map(move |i| self.row(i))
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        let cols = vec!["a".to_string(), "emb_0".to_string()];
        let mut m = FeatureMatrix::new(cols, 1);
        m.push_row(&[1.0, 0.5]).unwrap();
        m.push_row(&[2.0, 0.25]).unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.embedding_width(), 1);
        assert_eq!(m.row(1), Some(&[2.0, 0.25][..]));
        assert_eq!(m.row(2), None);
        assert_eq!(m.rows().count(), 2);
    }

    #[test]
    fn test_push_row_width() {
        let mut m = FeatureMatrix::new(vec!["a".to_string()], 1);
        assert!(m.push_row(&[1.0, 2.0]).is_err());
        assert_eq!(m.n_rows(), 0);
    }
}
