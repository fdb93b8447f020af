//! # Operation: one parallel apply.
//!
//! `sapply`, `lapply` and `apply` share a single submission path. An
//! [`Operation`] carries the items, the work and its extra args, plus the
//! shape used to assemble the mapped results:
//!
//! ```text
//! lapply         → [r0, r1, ...]
//! sapply         → [r0, r1, ...], one-element arrays unwrapped
//! apply(Rows)    → [row0, row1, ...]
//! apply(Columns) → [col0, col1, ...]
//! apply(Cells)   → [[r00, r01, ...], [r10, ...], ...]  (rows × cols)
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cluster::{Cluster, ClusterError};
use crate::error::TaskError;
use crate::value::{Margin, Matrix, Namespace, Value};
use crate::work::{NodeContext, WorkRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Simplify,
    List,
    Margin { margin: Margin, cols: usize },
}

/// A parallel apply awaiting submission.
pub struct Operation {
    shape: Shape,
    items: Vec<Value>,
    work: WorkRef,
    args: Arc<[Value]>,
}

impl Operation {
    /// Map with simplification.
    pub fn sapply(items: Vec<Value>, work: WorkRef, args: Vec<Value>) -> Self {
        Self::with_shape(Shape::Simplify, items, work, args)
    }

    /// Map returning the plain list of results.
    pub fn lapply(items: Vec<Value>, work: WorkRef, args: Vec<Value>) -> Self {
        Self::with_shape(Shape::List, items, work, args)
    }

    /// Map over the rows, columns or cells of `matrix`.
    pub fn apply(matrix: Matrix, margin: Margin, work: WorkRef, args: Vec<Value>) -> Self {
        let cols = matrix.cols();
        Self::with_shape(
            Shape::Margin { margin, cols },
            matrix.into_items(margin),
            work,
            args,
        )
    }

    fn with_shape(shape: Shape, items: Vec<Value>, work: WorkRef, args: Vec<Value>) -> Self {
        Self {
            shape,
            items,
            work,
            args: args.into(),
        }
    }

    /// Number of work invocations (expected progress ticks).
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// The work mapped over the items.
    pub fn work(&self) -> &WorkRef {
        &self.work
    }

    /// Replaces the work, keeping items, args and shape.
    pub fn with_work(mut self, work: WorkRef) -> Self {
        self.work = work;
        self
    }

    /// Maps the work over the cluster and assembles the result.
    pub fn run(self, cluster: &dyn Cluster) -> Result<Value, ClusterError> {
        let results = cluster.map(self.items, self.work, self.args)?;
        Ok(finish(self.shape, results))
    }

    /// Maps the work sequentially in the calling thread (node 0, empty namespace).
    pub fn run_local(self) -> Result<Value, TaskError> {
        let namespace = Namespace::new();
        let token = CancellationToken::new();
        let ctx = NodeContext::new(0, &self.args, &namespace, &token);

        let results = self
            .items
            .iter()
            .map(|item| self.work.call(item, &ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(finish(self.shape, results))
    }
}

fn finish(shape: Shape, results: Vec<Value>) -> Value {
    match shape {
        Shape::List | Shape::Margin { margin: Margin::Rows | Margin::Columns, .. } => {
            Value::Array(results)
        }
        Shape::Simplify => simplify(results),
        Shape::Margin { margin: Margin::Cells, cols } => Value::Array(
            results
                .chunks(cols.max(1))
                .map(|row| Value::Array(row.to_vec()))
                .collect(),
        ),
    }
}

/// Unwraps results when every one is a one-element array.
fn simplify(results: Vec<Value>) -> Value {
    let unit = !results.is_empty()
        && results
            .iter()
            .all(|r| matches!(r, Value::Array(a) if a.len() == 1));
    if !unit {
        return Value::Array(results);
    }
    Value::Array(
        results
            .into_iter()
            .filter_map(|r| match r {
                Value::Array(mut a) => a.pop(),
                _ => None,
            })
            .collect(),
    )
}
