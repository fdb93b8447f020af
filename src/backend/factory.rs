use std::sync::Arc;

use super::{AsyncBackend, Backend, BackendKind, SyncBackend};
use crate::cluster::{ClusterFactory, LocalClusterFactory};
use crate::error::ConfigError;
use crate::events::Bus;
use crate::options::Options;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Creates backends from a string tag.
pub struct BackendFactory;

impl BackendFactory {
    /// Returns an inactive backend for `tag` (`"sync"` or `"async"`, case-insensitive).
    ///
    /// Fails with [`ConfigError::UnknownBackend`] on any other tag.
    pub fn get(tag: &str, options: &Options) -> Result<Box<dyn Backend>, ConfigError> {
        Ok(BackendBuilder::new(tag.parse()?, options.clone()).build())
    }
}

/// Builder for a backend with a custom cluster factory or event subscribers.
pub struct BackendBuilder {
    kind: BackendKind,
    options: Options,
    factory: Arc<dyn ClusterFactory>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl BackendBuilder {
    /// Creates a new builder for `kind`.
    pub fn new(kind: BackendKind, options: Options) -> Self {
        Self {
            kind,
            options,
            factory: Arc::new(LocalClusterFactory),
            subscribers: Vec::new(),
        }
    }

    /// Sets the factory that creates clusters on `start`.
    pub fn with_cluster_factory(mut self, factory: Arc<dyn ClusterFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive backend events through dedicated workers with
    /// bounded queues. Building with subscribers requires a tokio runtime.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the (inactive) backend.
    pub fn build(self) -> Box<dyn Backend> {
        let bus = Bus::new(self.options.bus_capacity_clamped());
        if !self.subscribers.is_empty() {
            // The listener ends once the backend (the only bus sender) is dropped.
            let _ = SubscriberSet::new(self.subscribers).listen(bus.subscribe());
        }

        match self.kind {
            BackendKind::Async => Box::new(AsyncBackend::from_parts(self.options, self.factory, bus)),
            BackendKind::Sync => Box::new(SyncBackend::from_parts(self.factory, bus)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventKind};
    use crate::spec::Specification;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn test_factory_dispatches_on_tag() {
        let opts = Options::default();
        assert_eq!(BackendFactory::get("async", &opts).unwrap().kind(), BackendKind::Async);
        assert_eq!(BackendFactory::get("Sync", &opts).unwrap().kind(), BackendKind::Sync);
        assert!(matches!(
            BackendFactory::get("mpi", &opts),
            Err(ConfigError::UnknownBackend { .. })
        ));
    }

    struct Recorder(Arc<Mutex<Vec<EventKind>>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.kind);
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_backend_events() {
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let mut backend = BackendBuilder::new(BackendKind::Sync, Options::default())
            .with_subscribers(vec![Arc::new(Recorder(Arc::clone(&kinds)))])
            .build();

        backend.start(&Specification::new()).await.unwrap();
        backend.stop().await.unwrap();
        drop(backend);

        for _ in 0..100 {
            if kinds.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(
            *kinds.lock().unwrap(),
            vec![EventKind::BackendStarted, EventKind::BackendStopped]
        );
    }
}
