//! # Worker session: a long-lived actor hosting a cluster.
//!
//! The session owns the [`Cluster`](crate::Cluster) on behalf of an async
//! backend and answers a small request/response protocol, so the backend
//! never touches the cluster directly.
//!
//! ## Architecture
//! ```text
//! WorkerSession (handle)                 session actor (tokio task)
//!   run_sync(f) ────── Run ─────────►  spawn_blocking(f(&host)) ─► reply
//!   submit_background(f) ─ Submit ──►  spawn_blocking(f(&host)) ─► pending
//!   poll_status(t) ◄──── ready watch ──  pending finished → outcome stored
//!   read_result() ────── Read ───────►  take outcome, status → Idle
//!   close(force, t) ──── Close ──────►  abandon pending, cluster.shutdown()
//! ```
//!
//! ## Rules
//! - At most **one** background call per session; it stays pending (status
//!   `Busy`) until its outcome is read.
//! - `run_sync` and `submit_background` are refused with
//!   [`SessionError::Busy`] while a call is pending.
//! - Dropping the handle ends the actor and shuts the hosted cluster down.

mod actor;
mod error;
mod handle;
mod host;
mod status;

pub use error::SessionError;
pub use handle::{CallOutcome, WorkerSession};
pub use host::SessionHost;
pub use status::{PollStatus, SessionStatus};
