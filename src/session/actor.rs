//! # SessionActor: the task that owns the hosted cluster.
//!
//! ```text
//! loop {
//!   select! {
//!     request  ─► handle()
//!     │   ├─► Run     → spawn_blocking(job) → await → ack
//!     │   ├─► Submit  → spawn_blocking(job) → pending, status=Busy
//!     │   ├─► Read    → take outcome, status=Idle
//!     │   └─► Close   → break (refused while busy unless forced)
//!     pending done ─► store outcome, ready=true
//!     channel closed ─► break
//!   }
//! }
//! teardown: cluster.shutdown(), status=Finished
//! ```

use std::{ops::ControlFlow, sync::Arc};

use futures::future::OptionFuture;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::{JoinError, JoinHandle},
};

use super::{CallOutcome, SessionError, SessionHost, SessionStatus};
use crate::cluster::ClusterError;

pub(super) type Ack<T> = oneshot::Sender<Result<T, SessionError>>;

/// Blocking job run against the host; replies through its own channel.
pub(super) type HostJob = Box<dyn FnOnce(&SessionHost) + Send>;

/// Blocking job whose outcome is kept until read.
pub(super) type BackgroundJob = Box<dyn FnOnce(&SessionHost) -> CallOutcome + Send>;

/// Requests understood by the actor.
pub(super) enum Request {
    Run { job: HostJob, ack: Ack<()> },
    Submit { job: BackgroundJob, ack: Ack<()> },
    Read { reply: Ack<CallOutcome> },
    Close { force: bool, ack: Ack<()> },
}

pub(super) struct SessionActor {
    host: Arc<SessionHost>,
    status: watch::Sender<SessionStatus>,
    ready: watch::Sender<bool>,
    pending: Option<JoinHandle<CallOutcome>>,
    outcome: Option<CallOutcome>,
    closing: Option<Ack<()>>,
}

impl SessionActor {
    pub(super) fn new(status: watch::Sender<SessionStatus>, ready: watch::Sender<bool>) -> Self {
        Self {
            host: Arc::new(SessionHost::default()),
            status,
            ready,
            pending: None,
            outcome: None,
            closing: None,
        }
    }

    pub(super) async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        self.status.send_replace(SessionStatus::Idle);
        tracing::debug!("session started");

        loop {
            tokio::select! {
                req = rx.recv() => {
                    let Some(req) = req else { break };
                    if self.handle(req).await.is_break() {
                        break;
                    }
                }
                joined = OptionFuture::from(self.pending.as_mut()), if self.pending.is_some() => {
                    self.pending = None;
                    if let Some(joined) = joined {
                        self.complete(joined);
                    }
                }
            }
        }

        self.teardown().await;
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some() || self.outcome.is_some()
    }

    async fn handle(&mut self, req: Request) -> ControlFlow<()> {
        match req {
            Request::Run { job, ack } => {
                if self.is_busy() {
                    let _ = ack.send(Err(SessionError::Busy));
                    return ControlFlow::Continue(());
                }
                let host = Arc::clone(&self.host);
                let res = tokio::task::spawn_blocking(move || job(host.as_ref())).await;
                let _ = ack.send(res.map_err(|e| SessionError::Call(crashed(e))));
            }
            Request::Submit { job, ack } => {
                if self.is_busy() {
                    let _ = ack.send(Err(SessionError::Busy));
                    return ControlFlow::Continue(());
                }
                let host = Arc::clone(&self.host);
                self.pending = Some(tokio::task::spawn_blocking(move || job(host.as_ref())));
                self.ready.send_replace(false);
                self.status.send_replace(SessionStatus::Busy);
                let _ = ack.send(Ok(()));
            }
            Request::Read { reply } => {
                let res = match self.outcome.take() {
                    Some(outcome) => {
                        self.ready.send_replace(false);
                        self.status.send_replace(SessionStatus::Idle);
                        Ok(outcome)
                    }
                    None if self.pending.is_some() => Err(SessionError::NotReady),
                    None => Err(SessionError::NothingPending),
                };
                let _ = reply.send(res);
            }
            Request::Close { force, ack } => {
                if self.is_busy() && !force {
                    let _ = ack.send(Err(SessionError::Busy));
                    return ControlFlow::Continue(());
                }
                if self.pending.take().is_some() {
                    tracing::debug!("abandoning pending background call");
                }
                self.outcome = None;
                self.closing = Some(ack);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn complete(&mut self, joined: Result<CallOutcome, JoinError>) {
        self.outcome = Some(joined.unwrap_or_else(|e| Err(SessionError::Call(crashed(e)))));
        self.ready.send_replace(true);
    }

    async fn teardown(mut self) {
        if let Some(cluster) = self.host.take() {
            if let Err(e) = tokio::task::spawn_blocking(move || cluster.shutdown()).await {
                tracing::warn!(error = %e, "cluster shutdown panicked");
            }
        }
        self.status.send_replace(SessionStatus::Finished);
        tracing::debug!("session finished");

        if let Some(ack) = self.closing.take() {
            let _ = ack.send(Ok(()));
        }
    }
}

fn crashed(e: JoinError) -> ClusterError {
    ClusterError::Crashed {
        reason: e.to_string(),
    }
}
