//! # One cluster node: an OS thread owning a namespace.
//!
//! ```text
//! Sender<NodeJob> ──► [node thread] ── job(&mut ns, &token) ──► reply channel
//!                           └─► panic caught → TaskError::Panicked
//! ```
//!
//! The thread exits when its job channel is closed.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::value::Namespace;

/// Job executed on a node thread.
pub(super) type NodeJob = Box<dyn FnOnce(&mut Namespace, &CancellationToken) + Send>;

/// Starts node `index` and returns its job sender.
pub(super) fn spawn_node(
    index: usize,
    token: CancellationToken,
) -> std::io::Result<mpsc::Sender<NodeJob>> {
    let (tx, rx) = mpsc::channel::<NodeJob>();

    std::thread::Builder::new()
        .name(format!("batchvisor-node-{index}"))
        .spawn(move || {
            let mut namespace = Namespace::new();
            while let Ok(job) = rx.recv() {
                job(&mut namespace, &token);
            }
            tracing::debug!(node = index, "cluster node exited");
        })?;

    Ok(tx)
}

/// Runs `f`, converting a panic into [`TaskError::Panicked`].
pub(super) fn guarded<R>(f: impl FnOnce() -> Result<R, TaskError>) -> Result<R, TaskError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res,
        Err(payload) => Err(TaskError::Panicked {
            info: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
