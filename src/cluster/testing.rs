//! Cluster doubles shared by unit tests.

use std::sync::Arc;
use std::time::Duration;

use super::{Cluster, ClusterError, ClusterFactory, LocalCluster};
use crate::spec::{ClusterKind, Specification};
use crate::value::{Namespace, Value};
use crate::work::{Expr, WorkRef};

/// Local cluster whose `shutdown` blocks for `delay` first.
pub(crate) struct SlowShutdown {
    inner: LocalCluster,
    delay: Duration,
}

impl SlowShutdown {
    pub(crate) fn start(size: usize, delay: Duration) -> Result<Self, ClusterError> {
        Ok(Self {
            inner: LocalCluster::start(size, ClusterKind::Psock)?,
            delay,
        })
    }
}

impl Cluster for SlowShutdown {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn kind(&self) -> ClusterKind {
        self.inner.kind()
    }

    fn map(
        &self,
        items: Vec<Value>,
        work: WorkRef,
        args: Arc<[Value]>,
    ) -> Result<Vec<Value>, ClusterError> {
        self.inner.map(items, work, args)
    }

    fn export(&self, values: Namespace) -> Result<(), ClusterError> {
        self.inner.export(values)
    }

    fn evaluate(&self, expr: &Expr) -> Result<Vec<Value>, ClusterError> {
        self.inner.evaluate(expr)
    }

    fn list_names(&self) -> Result<Vec<Vec<String>>, ClusterError> {
        self.inner.list_names()
    }

    fn clear(&self) -> Result<(), ClusterError> {
        self.inner.clear()
    }

    fn shutdown(&self) {
        std::thread::sleep(self.delay);
        self.inner.shutdown();
    }
}

/// Factory for [`SlowShutdown`] clusters.
pub(crate) struct SlowShutdownFactory(pub(crate) Duration);

impl ClusterFactory for SlowShutdownFactory {
    fn create(&self, spec: &Specification) -> Result<Arc<dyn Cluster>, ClusterError> {
        Ok(Arc::new(SlowShutdown::start(spec.cores(), self.0)?))
    }
}
