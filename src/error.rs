//! Error types used by backends, sessions and user work.
//!
//! This module defines three error enums:
//!
//! - [`TaskError`]: errors raised by user work executing on a cluster node.
//! - [`ConfigError`]: configuration problems with no usable fallback.
//! - [`BackendError`]: errors raised by the backend API itself.
//!
//! Every enum provides `as_label` (stable snake_case label for logs).
//! Worker errors travel verbatim: a [`TaskError`] raised inside a node is
//! surfaced unchanged as [`BackendError::Task`] when the output is read.

use std::time::Duration;

use thiserror::Error;

use crate::backend::TaskState;
use crate::cluster::ClusterError;
use crate::session::{PollStatus, SessionError, SessionStatus};

/// # Errors produced by user work.
///
/// These are returned by [`Work::call`](crate::Work::call) and
/// [`Expr`](crate::Expr) evaluation. The library never inspects or retries them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Work failed with a message.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Work panicked; the panic was caught on the node.
    #[error("work panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Work was abandoned because its cluster was shut down.
    #[error("cluster shut down before the item ran")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    ///
    /// # Example
    /// ```
    /// use batchvisor::TaskError;
    ///
    /// let err = TaskError::fail("boom");
    /// assert_eq!(err.to_string(), "execution failed: boom");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }
}

/// # Configuration errors.
///
/// Fatal: no corrected configuration exists.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The machine does not have the two cores a cluster needs.
    #[error("not enough cores: {available} available, at least 2 required")]
    NotEnoughCores {
        /// Cores reported by the platform.
        available: usize,
    },

    /// Unknown backend tag passed to the backend factory.
    #[error("unknown backend type '{tag}'")]
    UnknownBackend {
        /// The rejected tag.
        tag: String,
    },

    /// Unknown bar tag passed to the bar factory.
    #[error("unknown progress bar type '{tag}'")]
    UnknownBar {
        /// The rejected tag.
        tag: String,
    },

    /// Unknown context tag passed to the context factory.
    #[error("unknown context type '{tag}'")]
    UnknownContext {
        /// The rejected tag.
        tag: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NotEnoughCores { .. } => "config_not_enough_cores",
            ConfigError::UnknownBackend { .. } => "config_unknown_backend",
            ConfigError::UnknownBar { .. } => "config_unknown_bar",
            ConfigError::UnknownContext { .. } => "config_unknown_context",
        }
    }
}

/// # Errors produced by the backend API.
///
/// State violations are raised synchronously at the offending call and
/// are never retried.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BackendError {
    /// `start` was called on a backend that already owns a cluster.
    #[error("a cluster is already active on this backend; stop it before starting a new one")]
    ClusterAlreadyActive,

    /// The operation requires an active backend.
    #[error("no active cluster on this backend; call start first")]
    ClusterNotActive,

    /// A task is still running on the backend.
    #[error("backend is busy: a task is still running")]
    BackendBusy,

    /// A task completed but its output has not been read yet.
    #[error("a completed task has unread output; call get_output before submitting")]
    TaskCompletedUnread,

    /// No task was submitted since the last output was read.
    #[error("no task has been started on this backend")]
    TaskNotStarted,

    /// `stop` was called while a task was pending and forceful stop is off.
    #[error("cannot stop a busy backend ({state:?}) unless forceful stop is enabled")]
    BusyBackendStopNotAllowed {
        /// The task state at the time of the call.
        state: TaskState,
    },

    /// Teardown was not acknowledged in time; the backend is inactive anyway.
    #[error("backend teardown not acknowledged within {timeout:?}")]
    StopTimedOut {
        /// The configured stop timeout.
        timeout: Duration,
    },

    /// A name requested for export is absent from the source namespace.
    #[error("object '{name}' not found")]
    NameNotFound {
        /// The missing name.
        name: String,
    },

    /// Opaque work cannot be decorated with progress logging.
    #[error("work '{name}' is a primitive and cannot be tracked for progress")]
    PrimitiveTaskNotAllowed {
        /// Name of the rejected work.
        name: String,
    },

    /// The progress log file could not be created.
    #[error("failed to create temporary progress log: {source}")]
    TemporaryFileCreationFailed {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Session/poll combination outside the task-state table.
    #[error("inconsistent session state: status={status:?} poll={poll:?}")]
    InconsistentState {
        /// Session status observed.
        status: SessionStatus,
        /// Poll result observed.
        poll: PollStatus,
    },

    /// User work failed; re-raised verbatim.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Cluster-level failure (not caused by user work).
    #[error("cluster error: {0}")]
    Cluster(ClusterError),

    /// Session transport failure.
    #[error("session error: {0}")]
    Session(SessionError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BackendError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use batchvisor::BackendError;
    ///
    /// assert_eq!(BackendError::BackendBusy.as_label(), "backend_busy");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BackendError::ClusterAlreadyActive => "cluster_already_active",
            BackendError::ClusterNotActive => "cluster_not_active",
            BackendError::BackendBusy => "backend_busy",
            BackendError::TaskCompletedUnread => "task_completed_unread",
            BackendError::TaskNotStarted => "task_not_started",
            BackendError::BusyBackendStopNotAllowed { .. } => "busy_backend_stop_not_allowed",
            BackendError::StopTimedOut { .. } => "stop_timed_out",
            BackendError::NameNotFound { .. } => "name_not_found",
            BackendError::PrimitiveTaskNotAllowed { .. } => "primitive_task_not_allowed",
            BackendError::TemporaryFileCreationFailed { .. } => "temporary_file_creation_failed",
            BackendError::InconsistentState { .. } => "inconsistent_state",
            BackendError::Task(e) => e.as_label(),
            BackendError::Cluster(_) => "cluster_error",
            BackendError::Session(_) => "session_error",
            BackendError::Config(e) => e.as_label(),
        }
    }
}

impl From<ClusterError> for BackendError {
    /// Worker errors are unwrapped so they reach the caller unchanged.
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::Task(e) => BackendError::Task(e),
            other => BackendError::Cluster(other),
        }
    }
}

impl From<SessionError> for BackendError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Busy | SessionError::NotReady => BackendError::BackendBusy,
            SessionError::NothingPending => BackendError::TaskNotStarted,
            SessionError::Call(e) => e.into(),
            other => BackendError::Session(other),
        }
    }
}
