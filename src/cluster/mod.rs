//! # Worker clusters.
//!
//! A [`Cluster`] is a fixed-size pool of worker nodes that can map work over
//! a batch of items and return the results in input order. Each node keeps
//! its own top-level [`Namespace`].
//!
//! The trait is **synchronous**: every method may block until all nodes have
//! answered. Sessions only call it from tokio's blocking pool.
//!
//! ## Architecture
//! ```text
//! ClusterFactory::create(spec) ──► Arc<dyn Cluster>
//!
//! map(items, work, args)
//!   ├─► split items into N contiguous chunks
//!   ├─► node 0: chunk 0 ──► work.call(item) ... (stops at first error)
//!   ├─► node 1: chunk 1 ──► ...
//!   └─► node N: chunk N
//!        ▼
//!   concatenate chunk results in node order (= input order)
//! ```
//!
//! [`LocalCluster`] is the bundled implementation (one OS thread per node).

mod local;
mod node;
mod split;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use thiserror::Error;

use crate::error::TaskError;
use crate::spec::{ClusterKind, Specification};
use crate::value::{Namespace, Value};
use crate::work::{Expr, WorkRef};

pub use local::{LocalCluster, LocalClusterFactory};
pub use split::split_ranges;

/// Errors produced by a cluster.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ClusterError {
    /// User work failed on a node.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// A node is gone (cluster shut down or node thread lost).
    #[error("node {node} is unavailable")]
    NodeUnavailable {
        /// Index of the node.
        node: usize,
    },

    /// A node could not be started.
    #[error("failed to spawn cluster node: {source}")]
    Spawn {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The call crashed outside of user work.
    #[error("cluster call crashed: {reason}")]
    Crashed {
        /// What went wrong.
        reason: String,
    },
}

/// Pool of worker nodes.
pub trait Cluster: Send + Sync + 'static {
    /// Number of nodes.
    fn size(&self) -> usize;

    /// Kind the cluster was created as.
    fn kind(&self) -> ClusterKind;

    /// Maps `work` over `items`, returning results in input order.
    ///
    /// Fails with the error of the earliest failing item.
    fn map(&self, items: Vec<Value>, work: WorkRef, args: Arc<[Value]>)
    -> Result<Vec<Value>, ClusterError>;

    /// Binds every entry of `values` on every node.
    fn export(&self, values: Namespace) -> Result<(), ClusterError>;

    /// Evaluates `expr` on every node; one result per node.
    fn evaluate(&self, expr: &Expr) -> Result<Vec<Value>, ClusterError>;

    /// Sorted top-level names, one list per node.
    fn list_names(&self) -> Result<Vec<Vec<String>>, ClusterError>;

    /// Removes every top-level name on every node.
    fn clear(&self) -> Result<(), ClusterError>;

    /// Stops the nodes. Idempotent.
    fn shutdown(&self);
}

/// Creates clusters from a [`Specification`].
pub trait ClusterFactory: Send + Sync + 'static {
    /// Starts a cluster matching `spec`.
    fn create(&self, spec: &Specification) -> Result<Arc<dyn Cluster>, ClusterError>;
}
