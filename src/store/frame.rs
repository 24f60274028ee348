//! frame.rs
//! Index-aligned numeric columns, one per analysed variable.
//!
//! Row `i` of every column refers to observation `i`. A `None` cell means the
//! observation had no usable number for that variable (missing, non-numeric,
//! or rejected as an outlier), so pairwise statistics only use rows where both
//! columns are present.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesFrame {
    rows: usize,
    columns: Vec<Vec<Option<f64>>>,
    names: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl SeriesFrame {
    pub fn new(rows: usize) -> Self {
        Self { rows, ..Default::default() }
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn names(&self) -> &[String] { &self.names }

    /// Inserts or replaces a column. Short columns are padded with `None`.
    pub fn insert(&mut self, name: &str, mut column: Vec<Option<f64>>) {
        column.resize(self.rows, None);
        match self.lookup.get(name) {
            Some(&idx) => self.columns[idx] = column,
            None => {
                self.lookup.insert(name.to_string(), self.columns.len());
                self.names.push(name.to_string());
                self.columns.push(column);
            }
        }
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.lookup.get(name).map(|&i| self.columns[i].as_slice())
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<Option<f64>>> {
        let idx = *self.lookup.get(name)?;
        Some(&mut self.columns[idx])
    }

    /// The present values of a column, in row order.
    pub fn values(&self, name: &str) -> Vec<f64> {
        self.column(name)
            .map(|c| c.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Rows where both columns hold a value, as two parallel vectors.
    pub fn paired(&self, x: &str, y: &str) -> (Vec<f64>, Vec<f64>) {
        let (Some(xs), Some(ys)) = (self.column(x), self.column(y)) else {
            return (Vec::new(), Vec::new());
        };
        xs.iter()
            .zip(ys)
            .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
            .unzip()
    }
}
