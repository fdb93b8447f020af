use std::sync::Arc;

use async_trait::async_trait;

use super::{Backend, BackendKind, Operation, TaskState, select_names};
use crate::cluster::{Cluster, ClusterError, ClusterFactory, LocalClusterFactory};
use crate::error::BackendError;
use crate::events::{Bus, Event, EventKind};
use crate::options::Options;
use crate::spec::Specification;
use crate::value::{Namespace, Value};
use crate::work::Expr;

/// Backend that owns its cluster and completes submissions in place.
///
/// `sapply` returns once the map is done and stores the output; worker
/// errors surface from `sapply` itself. Progress tracking is not supported.
pub struct SyncBackend {
    factory: Arc<dyn ClusterFactory>,
    bus: Bus,
    cluster: Option<Arc<dyn Cluster>>,
    output: Option<Value>,
}

impl SyncBackend {
    /// Creates an inactive backend using [`LocalCluster`](crate::LocalCluster)s.
    pub fn new(options: Options) -> Self {
        Self::with_factory(options, Arc::new(LocalClusterFactory))
    }

    /// Creates an inactive backend using clusters from `factory`.
    pub fn with_factory(options: Options, factory: Arc<dyn ClusterFactory>) -> Self {
        Self::from_parts(factory, Bus::new(options.bus_capacity_clamped()))
    }

    pub(crate) fn from_parts(factory: Arc<dyn ClusterFactory>, bus: Bus) -> Self {
        Self {
            factory,
            bus,
            cluster: None,
            output: None,
        }
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_backend(self.kind().as_str())
    }

    /// Runs `f` against the cluster on the blocking pool.
    async fn blocking<R, F>(&self, f: F) -> Result<R, BackendError>
    where
        F: FnOnce(&dyn Cluster) -> Result<R, ClusterError> + Send + 'static,
        R: Send + 'static,
    {
        let cluster = Arc::clone(self.cluster.as_ref().ok_or(BackendError::ClusterNotActive)?);
        let res = tokio::task::spawn_blocking(move || f(cluster.as_ref()))
            .await
            .map_err(|e| ClusterError::Crashed {
                reason: e.to_string(),
            })?;
        Ok(res?)
    }
}

#[async_trait]
impl Backend for SyncBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sync
    }

    fn is_active(&self) -> bool {
        self.cluster.is_some()
    }

    fn supports_progress(&self) -> bool {
        false
    }

    fn bus(&self) -> &Bus {
        &self.bus
    }

    async fn start(&mut self, spec: &Specification) -> Result<(), BackendError> {
        if self.is_active() {
            return Err(BackendError::ClusterAlreadyActive);
        }

        let factory = Arc::clone(&self.factory);
        let spec_for_pool = spec.clone();
        let cluster = tokio::task::spawn_blocking(move || -> Result<Arc<dyn Cluster>, ClusterError> {
            let cluster = factory.create(&spec_for_pool)?;
            cluster.clear()?;
            Ok(cluster)
        })
        .await
        .map_err(|e| ClusterError::Crashed {
            reason: e.to_string(),
        })??;

        let size = cluster.size();
        self.cluster = Some(cluster);
        self.output = None;

        for warning in spec.warnings() {
            self.bus
                .publish(Event::warning(warning.clone()).with_backend(self.kind().as_str()));
        }
        self.bus.publish(self.event(EventKind::BackendStarted).with_total(size));
        tracing::debug!(backend = %self.kind(), size, "backend started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), BackendError> {
        let cluster = self.cluster.take().ok_or(BackendError::ClusterNotActive)?;
        self.output = None;
        if let Err(e) = tokio::task::spawn_blocking(move || cluster.shutdown()).await {
            tracing::warn!(error = %e, "cluster shutdown panicked");
        }
        self.bus.publish(self.event(EventKind::BackendStopped));
        tracing::debug!(backend = %self.kind(), "backend stopped");
        Ok(())
    }

    async fn clear(&self) -> Result<(), BackendError> {
        self.blocking(|cluster| cluster.clear()).await
    }

    async fn peek(&self) -> Result<Vec<Vec<String>>, BackendError> {
        self.blocking(|cluster| cluster.list_names()).await
    }

    async fn export(&self, names: &[&str], env: &Namespace) -> Result<(), BackendError> {
        if !self.is_active() {
            return Err(BackendError::ClusterNotActive);
        }
        let values = select_names(names, env)?;
        self.blocking(move |cluster| cluster.export(values)).await
    }

    async fn evaluate(&self, expr: Expr) -> Result<Vec<Value>, BackendError> {
        self.blocking(move |cluster| cluster.evaluate(&expr)).await
    }

    async fn submit(&mut self, op: Operation) -> Result<(), BackendError> {
        if self.task_state().await?.is_completed() {
            return Err(BackendError::TaskCompletedUnread);
        }

        let total = op.total();
        self.bus.publish(self.event(EventKind::TaskSubmitted).with_total(total));
        let value = self.blocking(move |cluster| op.run(cluster)).await?;
        self.output = Some(value);
        Ok(())
    }

    async fn get_output(&mut self, _wait: bool) -> Result<Value, BackendError> {
        if !self.is_active() {
            return Err(BackendError::ClusterNotActive);
        }
        let value = self.output.take().ok_or(BackendError::TaskNotStarted)?;
        self.bus.publish(self.event(EventKind::OutputRead));
        Ok(value)
    }

    async fn task_state(&self) -> Result<TaskState, BackendError> {
        if !self.is_active() {
            return Err(BackendError::ClusterNotActive);
        }
        Ok(if self.output.is_some() {
            TaskState::Completed
        } else {
            TaskState::NotStarted
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::work::{NodeContext, WorkFn, WorkRef};
    use serde_json::json;

    fn inc() -> WorkRef {
        WorkFn::arc("inc", |x: &Value, _ctx: &NodeContext<'_>| {
            Ok(json!(x.as_i64().unwrap_or_default() + 1))
        })
    }

    async fn started() -> SyncBackend {
        let mut spec = Specification::new();
        spec.set_cores_with(2, 8).unwrap();
        let mut backend = SyncBackend::new(Options::default());
        backend.start(&spec).await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_sapply_completes_in_place() {
        let mut backend = started().await;
        assert!(!backend.supports_progress());

        backend
            .sapply(vec![json!(1), json!(2), json!(3)], inc(), vec![])
            .await
            .unwrap();
        assert!(backend.task_state().await.unwrap().is_completed());
        assert!(matches!(
            backend.sapply(vec![json!(1)], inc(), vec![]).await,
            Err(BackendError::TaskCompletedUnread)
        ));

        assert_eq!(backend.get_output(false).await.unwrap(), json!([2, 3, 4]));
        assert!(matches!(backend.get_output(false).await, Err(BackendError::TaskNotStarted)));
        backend.stop().await.unwrap();
        assert!(matches!(backend.stop().await, Err(BackendError::ClusterNotActive)));
    }

    #[tokio::test]
    async fn test_worker_error_surfaces_from_sapply() {
        let mut backend = started().await;
        let boom = WorkFn::arc("boom", |_: &Value, _: &NodeContext<'_>| -> Result<Value, TaskError> {
            Err(TaskError::fail("boom"))
        });
        assert!(matches!(
            backend.sapply(vec![json!(1)], boom, vec![]).await,
            Err(BackendError::Task(TaskError::Fail { .. }))
        ));
        assert!(backend.task_state().await.unwrap().not_started());
    }
}
