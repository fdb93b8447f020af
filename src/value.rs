//! # Data passed to and from cluster nodes.
//!
//! - [`Value`]: any user datum (`serde_json::Value`).
//! - [`Namespace`]: a node's top-level bindings, sorted by name.
//! - [`Matrix`] + [`Margin`]: input of an array-apply.

use std::collections::BTreeMap;

pub use serde_json::Value;

/// Top-level bindings of one node (or of the caller, as an export source).
pub type Namespace = BTreeMap<String, Value>;

/// Which dimension(s) of a [`Matrix`] an array-apply iterates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Margin {
    /// One item per row.
    Rows,
    /// One item per column.
    Columns,
    /// One item per cell.
    Cells,
}

/// Dense row-major matrix of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Value>,
}

impl Matrix {
    /// Builds a matrix from row-major data.
    ///
    /// Returns `None` when `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<Value>) -> Option<Self> {
        (rows.checked_mul(cols) == Some(data.len())).then_some(Self { rows, cols, data })
    }

    /// Builds a matrix from a list of equally long rows.
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Option<Self> {
        let n = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        Self::new(n, cols, rows.into_iter().flatten().collect())
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        (row < self.rows && col < self.cols).then(|| &self.data[row * self.cols + col])
    }

    /// Number of items an apply over `margin` produces.
    pub fn extent(&self, margin: Margin) -> usize {
        match margin {
            Margin::Rows => self.rows,
            Margin::Columns => self.cols,
            Margin::Cells => self.rows * self.cols,
        }
    }

    /// Splits the matrix into the items an apply over `margin` maps over.
    ///
    /// Rows and columns become arrays; cells are visited row by row.
    pub fn into_items(self, margin: Margin) -> Vec<Value> {
        match margin {
            Margin::Rows => self
                .data
                .chunks(self.cols.max(1))
                .take(self.rows)
                .map(|row| Value::Array(row.to_vec()))
                .collect(),
            Margin::Columns => (0..self.cols)
                .map(|c| {
                    Value::Array(
                        (0..self.rows)
                            .map(|r| self.data[r * self.cols + c].clone())
                            .collect(),
                    )
                })
                .collect(),
            Margin::Cells => self.data,
        }
    }
}
