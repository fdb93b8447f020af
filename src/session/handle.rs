use std::time::Duration;

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time,
};

use super::actor::{Ack, Request, SessionActor};
use super::{PollStatus, SessionError, SessionHost, SessionStatus};
use crate::value::Value;

/// Outcome of a background call.
pub type CallOutcome = Result<Value, SessionError>;

/// Capacity of the request channel between handle and actor.
const REQUEST_CAPACITY: usize = 8;

/// Handle to a running session actor.
///
/// Dropping the handle closes the request channel; the actor then shuts
/// the hosted cluster down and exits.
pub struct WorkerSession {
    tx: mpsc::Sender<Request>,
    status: watch::Receiver<SessionStatus>,
    ready: watch::Receiver<bool>,
    actor: JoinHandle<()>,
}

impl WorkerSession {
    /// Spawns the session actor and waits until it serves requests.
    ///
    /// Must be called within a tokio runtime.
    pub async fn spawn() -> Result<Self, SessionError> {
        let (tx, rx) = mpsc::channel(REQUEST_CAPACITY);
        let (status_tx, mut status) = watch::channel(SessionStatus::Starting);
        let (ready_tx, ready) = watch::channel(false);

        let actor = tokio::spawn(SessionActor::new(status_tx, ready_tx).run(rx));

        status
            .wait_for(|s| *s != SessionStatus::Starting)
            .await
            .map_err(|_| SessionError::Closed)?;

        Ok(Self {
            tx,
            status,
            ready,
            actor,
        })
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        if self.actor.is_finished() {
            return SessionStatus::Finished;
        }
        *self.status.borrow()
    }

    /// Runs `f` against the host on a blocking thread and returns its result.
    ///
    /// Refused with [`SessionError::Busy`] while a background call is pending.
    pub async fn run_sync<R, F>(&self, f: F) -> Result<R, SessionError>
    where
        F: FnOnce(&SessionHost) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (out_tx, out_rx) = oneshot::channel();
        let job = Box::new(move |host: &SessionHost| {
            let _ = out_tx.send(f(host));
        });
        self.request(|ack| Request::Run { job, ack }).await?;
        out_rx.await.map_err(|_| SessionError::Closed)
    }

    /// Starts `f` in the background; its outcome is kept until
    /// [`read_result`](Self::read_result).
    pub async fn submit_background<F>(&self, f: F) -> Result<(), SessionError>
    where
        F: FnOnce(&SessionHost) -> CallOutcome + Send + 'static,
    {
        let job = Box::new(f);
        self.request(|ack| Request::Submit { job, ack }).await
    }

    /// Waits for the background call to finish.
    ///
    /// - `Some(Duration::ZERO)`: non-blocking check.
    /// - `Some(t)`: waits at most `t`.
    /// - `None`: waits until the call finishes.
    pub async fn poll_status(&self, timeout: Option<Duration>) -> Result<PollStatus, SessionError> {
        if *self.ready.borrow() {
            return Ok(PollStatus::Ready);
        }

        let mut ready = self.ready.clone();
        let wait = async move {
            ready
                .wait_for(|r| *r)
                .await
                .map(|_| PollStatus::Ready)
                .map_err(|_| SessionError::Closed)
        };

        match timeout {
            Some(t) if t.is_zero() => Ok(PollStatus::Timeout),
            Some(t) => time::timeout(t, wait)
                .await
                .unwrap_or(Ok(PollStatus::Timeout)),
            None => wait.await,
        }
    }

    /// Takes the outcome of the finished background call.
    ///
    /// The session returns to `Idle`.
    pub async fn read_result(&self) -> Result<CallOutcome, SessionError> {
        self.request(|reply| Request::Read { reply }).await
    }

    /// Closes the session and shuts the hosted cluster down.
    ///
    /// A pending call is abandoned only when `force` is set; otherwise the
    /// request is refused with [`SessionError::Busy`] and the session keeps
    /// running. If the actor does not acknowledge within `timeout` it is
    /// aborted and [`SessionError::CloseTimedOut`] is returned.
    pub async fn close(&self, force: bool, timeout: Duration) -> Result<(), SessionError> {
        let (ack, rx) = oneshot::channel();
        if self.tx.send(Request::Close { force, ack }).await.is_err() {
            return Ok(());
        }

        match time::timeout(timeout, rx).await {
            Ok(Ok(res)) => res,
            Ok(Err(_)) => Ok(()),
            Err(_) => {
                self.actor.abort();
                tracing::warn!(?timeout, "session close timed out; actor aborted");
                Err(SessionError::CloseTimedOut { timeout })
            }
        }
    }

    async fn request<T>(&self, make: impl FnOnce(Ack<T>) -> Request) -> Result<T, SessionError> {
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(make(ack))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }
}
