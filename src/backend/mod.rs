//! # Backends: the task API over a cluster.
//!
//! A [`Backend`] owns a cluster and exposes the task-oriented API:
//! lifecycle (`start`/`stop`), namespace management (`clear`, `peek`,
//! `export`, `evaluate`), submission (`sapply`, `lapply`, `apply`) and
//! output retrieval (`get_output`).
//!
//! ## Variants
//! - [`AsyncBackend`]: hosts the cluster in a [`WorkerSession`](crate::WorkerSession);
//!   submissions return immediately and progress can be tracked.
//! - [`SyncBackend`]: owns the cluster directly; submissions complete in place.
//!
//! ## State machine
//! ```text
//! Inactive ──start──► Active(NotStarted) ──sapply──► Active(Running)
//!    ▲                   ▲                                │
//!    │                   └──────get_output──── Active(Completed)
//!    └──────────────stop (refused while busy unless forceful)
//! ```
//!
//! ## Rules
//! - Every operation except `start` requires an active backend.
//! - At most **one** outstanding task: submitting while `Running` fails with
//!   `BackendBusy`, while `Completed` with `TaskCompletedUnread`.
//! - `get_output` always consumes the stored output, on success and on error.

mod async_backend;
mod factory;
mod operation;
mod state;
mod sync_backend;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{BackendError, ConfigError};
use crate::events::Bus;
use crate::spec::Specification;
use crate::value::{Margin, Matrix, Namespace, Value};
use crate::work::{Expr, WorkRef};

pub use async_backend::AsyncBackend;
pub use factory::{BackendBuilder, BackendFactory};
pub use operation::Operation;
pub use state::TaskState;
pub use sync_backend::SyncBackend;

/// Backend variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// [`SyncBackend`].
    Sync,
    /// [`AsyncBackend`].
    Async,
}

impl BackendKind {
    /// Returns the tag of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sync => "sync",
            BackendKind::Async => "async",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(BackendKind::Sync),
            "async" => Ok(BackendKind::Async),
            _ => Err(ConfigError::UnknownBackend { tag: s.to_string() }),
        }
    }
}

/// Task API over a cluster.
///
/// Implemented by [`AsyncBackend`] and [`SyncBackend`], and by `&mut B` for
/// any backend `B` so contexts can decorate a borrowed backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend variant.
    fn kind(&self) -> BackendKind;

    /// Whether a cluster is active.
    fn is_active(&self) -> bool;

    /// Whether submissions can be tracked for progress while they run.
    fn supports_progress(&self) -> bool;

    /// Event bus of this backend.
    fn bus(&self) -> &Bus;

    /// Creates a cluster per `spec` and sanitizes every node's namespace.
    ///
    /// Fails with [`BackendError::ClusterAlreadyActive`] when active.
    async fn start(&mut self, spec: &Specification) -> Result<(), BackendError>;

    /// Tears the cluster down.
    ///
    /// Fails with [`BackendError::ClusterNotActive`] when inactive.
    async fn stop(&mut self) -> Result<(), BackendError>;

    /// Removes every name from every node's namespace.
    async fn clear(&self) -> Result<(), BackendError>;

    /// Returns the names defined on each node.
    async fn peek(&self) -> Result<Vec<Vec<String>>, BackendError>;

    /// Copies `names` from `env` into every node's namespace.
    ///
    /// Fails with [`BackendError::NameNotFound`] when a name is absent from `env`.
    async fn export(&self, names: &[&str], env: &Namespace) -> Result<(), BackendError>;

    /// Evaluates `expr` on every node and returns the per-node results.
    async fn evaluate(&self, expr: Expr) -> Result<Vec<Value>, BackendError>;

    /// Submits an operation.
    async fn submit(&mut self, op: Operation) -> Result<(), BackendError>;

    /// Reads the output of the last submission and clears it.
    ///
    /// With `wait = false` fails with [`BackendError::BackendBusy`] while the
    /// task runs; with `wait = true` blocks until it completes.
    async fn get_output(&mut self, wait: bool) -> Result<Value, BackendError>;

    /// Current task state.
    async fn task_state(&self) -> Result<TaskState, BackendError>;

    /// Submits `work` mapped over `items`, simplifying the results.
    async fn sapply(&mut self, items: Vec<Value>, work: WorkRef, args: Vec<Value>) -> Result<(), BackendError> {
        self.submit(Operation::sapply(items, work, args)).await
    }

    /// Submits `work` mapped over `items`, keeping the plain list of results.
    async fn lapply(&mut self, items: Vec<Value>, work: WorkRef, args: Vec<Value>) -> Result<(), BackendError> {
        self.submit(Operation::lapply(items, work, args)).await
    }

    /// Submits `work` mapped over the `margin` of `matrix`.
    async fn apply(
        &mut self,
        matrix: Matrix,
        margin: Margin,
        work: WorkRef,
        args: Vec<Value>,
    ) -> Result<(), BackendError> {
        self.submit(Operation::apply(matrix, margin, work, args)).await
    }
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for &mut B {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn supports_progress(&self) -> bool {
        (**self).supports_progress()
    }

    fn bus(&self) -> &Bus {
        (**self).bus()
    }

    async fn start(&mut self, spec: &Specification) -> Result<(), BackendError> {
        (**self).start(spec).await
    }

    async fn stop(&mut self) -> Result<(), BackendError> {
        (**self).stop().await
    }

    async fn clear(&self) -> Result<(), BackendError> {
        (**self).clear().await
    }

    async fn peek(&self) -> Result<Vec<Vec<String>>, BackendError> {
        (**self).peek().await
    }

    async fn export(&self, names: &[&str], env: &Namespace) -> Result<(), BackendError> {
        (**self).export(names, env).await
    }

    async fn evaluate(&self, expr: Expr) -> Result<Vec<Value>, BackendError> {
        (**self).evaluate(expr).await
    }

    async fn submit(&mut self, op: Operation) -> Result<(), BackendError> {
        (**self).submit(op).await
    }

    async fn get_output(&mut self, wait: bool) -> Result<Value, BackendError> {
        (**self).get_output(wait).await
    }

    async fn task_state(&self) -> Result<TaskState, BackendError> {
        (**self).task_state().await
    }
}

/// Copies `names` out of `env`.
pub(crate) fn select_names(names: &[&str], env: &Namespace) -> Result<Namespace, BackendError> {
    names
        .iter()
        .map(|name| {
            env.get(*name)
                .map(|v| ((*name).to_string(), v.clone()))
                .ok_or_else(|| BackendError::NameNotFound {
                    name: (*name).to_string(),
                })
        })
        .collect()
}
