//! # In-process cluster backed by one OS thread per node.
//!
//! Every node owns an isolated [`Namespace`]; the only way to reach it is a
//! job sent over the node's channel. Jobs are answered on a per-call reply
//! channel and collected in dispatch order, so `map` results come back in
//! input order no matter which node finishes first.
//!
//! ## Rules
//! - A chunk runs **sequentially** on its node and stops at its first error.
//! - `map` waits for **all** nodes before reporting, then returns the error
//!   of the earliest failing item.
//! - `shutdown` cancels the shared token (pending items fail with
//!   [`TaskError::Canceled`]) and closes every node channel.

use std::sync::{Arc, Mutex, PoisonError, mpsc};

use tokio_util::sync::CancellationToken;

use super::node::{NodeJob, guarded, spawn_node};
use super::{Cluster, ClusterError, ClusterFactory, split_ranges};
use crate::error::TaskError;
use crate::spec::{ClusterKind, Specification};
use crate::value::{Namespace, Value};
use crate::work::{Expr, NodeContext, WorkRef};

/// Thread-backed cluster.
pub struct LocalCluster {
    kind: ClusterKind,
    size: usize,
    nodes: Mutex<Vec<mpsc::Sender<NodeJob>>>,
    token: CancellationToken,
}

impl LocalCluster {
    /// Starts `size` nodes (at least one).
    pub fn start(size: usize, kind: ClusterKind) -> Result<Self, ClusterError> {
        let size = size.max(1);
        let token = CancellationToken::new();

        let nodes = (0..size)
            .map(|i| spawn_node(i, token.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| {
                token.cancel();
                ClusterError::Spawn { source }
            })?;

        tracing::debug!(size, %kind, "local cluster started");
        Ok(Self {
            kind,
            size,
            nodes: Mutex::new(nodes),
            token,
        })
    }

    /// Sends one job per entry of `jobs` (`(node, job)`) and collects the
    /// answers in the order of `jobs`.
    fn dispatch<R, F>(&self, jobs: Vec<(usize, F)>) -> Result<Vec<Result<R, TaskError>>, ClusterError>
    where
        F: FnOnce(&mut Namespace, &CancellationToken) -> Result<R, TaskError> + Send + 'static,
        R: Send + 'static,
    {
        let senders = self
            .nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let (tx, rx) = mpsc::channel::<(usize, Result<R, TaskError>)>();
        let mut nodes = Vec::with_capacity(jobs.len());

        for (slot, (node, job)) in jobs.into_iter().enumerate() {
            let sender = senders
                .get(node)
                .ok_or(ClusterError::NodeUnavailable { node })?;
            let reply = tx.clone();
            let wrapped: NodeJob = Box::new(move |ns, token| {
                let out = guarded(|| job(ns, token));
                let _ = reply.send((slot, out));
            });
            sender
                .send(wrapped)
                .map_err(|_| ClusterError::NodeUnavailable { node })?;
            nodes.push(node);
        }
        drop(tx);

        let mut answers: Vec<Option<Result<R, TaskError>>> = nodes.iter().map(|_| None).collect();
        for (slot, out) in rx.iter() {
            answers[slot] = Some(out);
        }

        answers
            .into_iter()
            .zip(nodes)
            .map(|(answer, node)| answer.ok_or(ClusterError::NodeUnavailable { node }))
            .collect()
    }

    /// Runs the same job on every node.
    fn broadcast<R, F>(&self, job: F) -> Result<Vec<R>, ClusterError>
    where
        F: Fn(&mut Namespace) -> Result<R, TaskError> + Clone + Send + 'static,
        R: Send + 'static,
    {
        let jobs: Vec<_> = (0..self.size)
            .map(|node| {
                let job = job.clone();
                (node, move |ns: &mut Namespace, _: &CancellationToken| job(ns))
            })
            .collect();

        let answers = self.dispatch(jobs)?;
        answers
            .into_iter()
            .map(|a| a.map_err(ClusterError::Task))
            .collect()
    }
}

impl Cluster for LocalCluster {
    fn size(&self) -> usize {
        self.size
    }

    fn kind(&self) -> ClusterKind {
        self.kind
    }

    fn map(
        &self,
        items: Vec<Value>,
        work: WorkRef,
        args: Arc<[Value]>,
    ) -> Result<Vec<Value>, ClusterError> {
        let ranges = split_ranges(items.len(), self.size);
        let mut items = items.into_iter();

        let jobs: Vec<_> = ranges
            .into_iter()
            .enumerate()
            .map(|(node, range)| {
                let chunk: Vec<Value> = items.by_ref().take(range.len()).collect();
                let work = Arc::clone(&work);
                let args = Arc::clone(&args);
                let job = move |ns: &mut Namespace, token: &CancellationToken| {
                    let ctx = NodeContext::new(node, &args, ns, token);
                    chunk
                        .iter()
                        .map(|item| {
                            if token.is_cancelled() {
                                return Err(TaskError::Canceled);
                            }
                            guarded(|| work.call(item, &ctx))
                        })
                        .collect::<Result<Vec<Value>, TaskError>>()
                };
                (node, job)
            })
            .collect();

        let mut out = Vec::new();
        for chunk in self.dispatch(jobs)? {
            out.extend(chunk?);
        }
        Ok(out)
    }

    fn export(&self, values: Namespace) -> Result<(), ClusterError> {
        let values = Arc::new(values);
        self.broadcast(move |ns| {
            ns.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(())
        })?;
        Ok(())
    }

    fn evaluate(&self, expr: &Expr) -> Result<Vec<Value>, ClusterError> {
        let expr = expr.clone();
        self.broadcast(move |ns| expr.eval(ns))
    }

    fn list_names(&self) -> Result<Vec<Vec<String>>, ClusterError> {
        self.broadcast(|ns| Ok(ns.keys().cloned().collect()))
    }

    fn clear(&self) -> Result<(), ClusterError> {
        self.broadcast(|ns| {
            ns.clear();
            Ok(())
        })?;
        Ok(())
    }

    fn shutdown(&self) {
        self.token.cancel();
        let mut nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        if !nodes.is_empty() {
            nodes.clear();
            tracing::debug!(size = self.size, "local cluster shut down");
        }
    }
}

impl Drop for LocalCluster {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Factory for [`LocalCluster`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClusterFactory;

impl ClusterFactory for LocalClusterFactory {
    fn create(&self, spec: &Specification) -> Result<Arc<dyn Cluster>, ClusterError> {
        Ok(Arc::new(LocalCluster::start(spec.cores(), spec.kind())?))
    }
}
