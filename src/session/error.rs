use std::time::Duration;

use thiserror::Error;

use crate::cluster::ClusterError;

/// Errors produced by the session protocol.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SessionError {
    /// A background call is pending.
    #[error("session busy: a background call is pending")]
    Busy,

    /// The background call has not finished yet.
    #[error("background call still running")]
    NotReady,

    /// No background call was submitted.
    #[error("no background call pending")]
    NothingPending,

    /// The session hosts no cluster.
    #[error("no cluster hosted in session")]
    NoCluster,

    /// The session actor is gone.
    #[error("session closed")]
    Closed,

    /// The actor did not acknowledge `close` in time and was aborted.
    #[error("session did not close within {timeout:?}")]
    CloseTimedOut {
        /// The close timeout.
        timeout: Duration,
    },

    /// The call itself failed.
    #[error(transparent)]
    Call(#[from] ClusterError),
}
