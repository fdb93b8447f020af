//! # AsyncBackend: backend hosted in a worker session.
//!
//! Every cluster call goes through the session: setup and inspection calls
//! use `run_sync`, submissions use `submit_background` and return at once.
//!
//! ```text
//! AsyncBackend ──► WorkerSession ──► SessionHost ──► Arc<dyn Cluster>
//!   submit(op)      submit_background(op.run(cluster))
//!   task_state      status() + poll_status(0) ──► TaskState::classify
//!   get_output      [poll_status(None)] ──► read_result()
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Backend, BackendKind, Operation, TaskState, select_names};
use crate::cluster::{Cluster, ClusterError, ClusterFactory, LocalClusterFactory};
use crate::error::BackendError;
use crate::events::{Bus, Event, EventKind};
use crate::options::Options;
use crate::session::{SessionError, SessionHost, WorkerSession};
use crate::spec::Specification;
use crate::value::{Namespace, Value};
use crate::work::Expr;

/// Backend whose cluster lives in a [`WorkerSession`].
///
/// ### Stop policy
/// - Stopping while a task is running or completed-unread fails with
///   [`BackendError::BusyBackendStopNotAllowed`] unless
///   [`Options::stop_forceful`] is set, in which case the task is abandoned.
/// - Teardown is bounded by [`Options::stop_timeout`]; on expiry the backend
///   is deactivated anyway and [`BackendError::StopTimedOut`] is returned.
///
/// Dropping the backend closes its session, which shuts the cluster down.
pub struct AsyncBackend {
    options: Options,
    factory: Arc<dyn ClusterFactory>,
    bus: Bus,
    session: Option<WorkerSession>,
}

impl AsyncBackend {
    /// Creates an inactive backend using [`LocalCluster`](crate::LocalCluster)s.
    pub fn new(options: Options) -> Self {
        Self::with_factory(options, Arc::new(LocalClusterFactory))
    }

    /// Creates an inactive backend using clusters from `factory`.
    pub fn with_factory(options: Options, factory: Arc<dyn ClusterFactory>) -> Self {
        let bus = Bus::new(options.bus_capacity_clamped());
        Self::from_parts(options, factory, bus)
    }

    pub(crate) fn from_parts(options: Options, factory: Arc<dyn ClusterFactory>, bus: Bus) -> Self {
        Self {
            options,
            factory,
            bus,
            session: None,
        }
    }

    fn session(&self) -> Result<&WorkerSession, BackendError> {
        self.session.as_ref().ok_or(BackendError::ClusterNotActive)
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_backend(self.kind().as_str())
    }

    /// Runs `f` against the hosted cluster inside the session.
    async fn with_cluster<R, F>(&self, f: F) -> Result<R, BackendError>
    where
        F: FnOnce(&dyn Cluster) -> Result<R, ClusterError> + Send + 'static,
        R: Send + 'static,
    {
        let session = self.session()?;
        let res = session
            .run_sync(move |host: &SessionHost| -> Result<R, SessionError> {
                let cluster = host.cluster()?;
                Ok(f(cluster.as_ref())?)
            })
            .await?;
        Ok(res?)
    }

    fn deactivate(&mut self, reason: Option<String>) {
        self.session = None;
        let mut ev = self.event(EventKind::BackendStopped);
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);
        tracing::debug!(backend = %self.kind(), "backend stopped");
    }
}

#[async_trait]
impl Backend for AsyncBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Async
    }

    fn is_active(&self) -> bool {
        self.session.is_some()
    }

    fn supports_progress(&self) -> bool {
        true
    }

    fn bus(&self) -> &Bus {
        &self.bus
    }

    async fn start(&mut self, spec: &Specification) -> Result<(), BackendError> {
        if self.is_active() {
            return Err(BackendError::ClusterAlreadyActive);
        }

        let session = WorkerSession::spawn().await?;
        let factory = Arc::clone(&self.factory);
        let spec_for_session = spec.clone();
        let size = session
            .run_sync(move |host: &SessionHost| -> Result<usize, ClusterError> {
                let cluster = factory.create(&spec_for_session)?;
                cluster.clear()?;
                let size = cluster.size();
                host.install(cluster);
                Ok(size)
            })
            .await??;
        self.session = Some(session);

        for warning in spec.warnings() {
            self.bus.publish(
                Event::warning(warning.clone()).with_backend(self.kind().as_str()),
            );
        }
        self.bus.publish(self.event(EventKind::BackendStarted).with_total(size));
        tracing::debug!(backend = %self.kind(), size, kind = %spec.kind(), "backend started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), BackendError> {
        let state = self.task_state().await?;
        if !state.not_started() && !self.options.stop_forceful {
            return Err(BackendError::BusyBackendStopNotAllowed { state });
        }

        let timeout = self.options.stop_timeout;
        let forced = !state.not_started();
        let res = self.session()?.close(forced, timeout).await;

        match res {
            Ok(()) => {
                let reason = forced.then(|| format!("forced while {state:?}"));
                self.deactivate(reason);
                Ok(())
            }
            Err(SessionError::CloseTimedOut { timeout }) => {
                self.deactivate(Some(format!("teardown timed out after {timeout:?}")));
                Err(BackendError::StopTimedOut { timeout })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<(), BackendError> {
        self.with_cluster(|cluster| cluster.clear()).await
    }

    async fn peek(&self) -> Result<Vec<Vec<String>>, BackendError> {
        self.with_cluster(|cluster| cluster.list_names()).await
    }

    async fn export(&self, names: &[&str], env: &Namespace) -> Result<(), BackendError> {
        self.session()?;
        let values = select_names(names, env)?;
        self.with_cluster(move |cluster| cluster.export(values)).await
    }

    async fn evaluate(&self, expr: Expr) -> Result<Vec<Value>, BackendError> {
        self.with_cluster(move |cluster| cluster.evaluate(&expr)).await
    }

    async fn submit(&mut self, op: Operation) -> Result<(), BackendError> {
        let state = self.task_state().await?;
        if state.is_running() {
            return Err(BackendError::BackendBusy);
        }
        if state.is_completed() {
            return Err(BackendError::TaskCompletedUnread);
        }

        let total = op.total();
        self.session()?
            .submit_background(move |host: &SessionHost| {
                let cluster = host.cluster()?;
                Ok(op.run(cluster.as_ref())?)
            })
            .await?;

        self.bus.publish(self.event(EventKind::TaskSubmitted).with_total(total));
        tracing::debug!(backend = %self.kind(), total, "task submitted");
        Ok(())
    }

    async fn get_output(&mut self, wait: bool) -> Result<Value, BackendError> {
        let state = self.task_state().await?;
        if state.not_started() {
            return Err(BackendError::TaskNotStarted);
        }

        let session = self.session()?;
        if state.is_running() {
            if !wait {
                return Err(BackendError::BackendBusy);
            }
            session.poll_status(None).await?;
        }

        match session.read_result().await? {
            Ok(value) => {
                self.bus.publish(self.event(EventKind::OutputRead));
                Ok(value)
            }
            Err(e) => {
                let err = BackendError::from(e);
                self.bus
                    .publish(self.event(EventKind::OutputFailed).with_reason(err.to_string()));
                Err(err)
            }
        }
    }

    async fn task_state(&self) -> Result<TaskState, BackendError> {
        let session = self.session()?;
        let status = session.status();
        let poll = session.poll_status(Some(Duration::ZERO)).await?;
        TaskState::classify(status, poll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::testing::SlowShutdownFactory;
    use crate::error::TaskError;
    use crate::spec::ClusterKind;
    use crate::work::{NodeContext, WorkFn, WorkRef};
    use serde_json::json;

    fn two_cores() -> Specification {
        let mut spec = Specification::new();
        spec.set_cores_with(2, 8).unwrap();
        spec.set_type_for(Some("psock"), true);
        spec
    }

    fn slow_inc(delay: Duration) -> WorkRef {
        WorkFn::arc("slow_inc", move |x: &Value, _ctx: &NodeContext<'_>| {
            std::thread::sleep(delay);
            Ok(json!(x.as_i64().unwrap_or_default() + 1))
        })
    }

    async fn started(options: Options) -> AsyncBackend {
        let mut backend = AsyncBackend::new(options);
        backend.start(&two_cores()).await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_operations_require_active_backend() {
        let mut backend = AsyncBackend::new(Options::default());
        assert!(matches!(backend.peek().await, Err(BackendError::ClusterNotActive)));
        assert!(matches!(backend.task_state().await, Err(BackendError::ClusterNotActive)));
        assert!(matches!(backend.get_output(true).await, Err(BackendError::ClusterNotActive)));
        assert!(matches!(backend.stop().await, Err(BackendError::ClusterNotActive)));
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let mut backend = started(Options::default()).await;
        assert!(matches!(
            backend.start(&two_cores()).await,
            Err(BackendError::ClusterAlreadyActive)
        ));
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_twice_fails() {
        let mut backend = started(Options::default()).await;
        backend.stop().await.unwrap();
        assert!(!backend.is_active());
        assert!(matches!(backend.stop().await, Err(BackendError::ClusterNotActive)));
    }

    #[tokio::test]
    async fn test_immediate_output_is_busy_then_waits() {
        let mut backend = started(Options::default()).await;
        backend
            .sapply(
                vec![json!(1), json!(2), json!(3)],
                slow_inc(Duration::from_millis(100)),
                vec![],
            )
            .await
            .unwrap();

        assert!(backend.task_state().await.unwrap().is_running());
        assert!(matches!(backend.get_output(false).await, Err(BackendError::BackendBusy)));
        assert!(matches!(
            backend.sapply(vec![json!(1)], slow_inc(Duration::ZERO), vec![]).await,
            Err(BackendError::BackendBusy)
        ));
        assert_eq!(backend.get_output(true).await.unwrap(), json!([2, 3, 4]));
    }

    #[tokio::test]
    async fn test_output_is_read_exactly_once() {
        let mut backend = started(Options::default()).await;
        assert!(matches!(backend.get_output(false).await, Err(BackendError::TaskNotStarted)));

        backend
            .sapply(vec![json!(1)], slow_inc(Duration::ZERO), vec![])
            .await
            .unwrap();
        assert_eq!(backend.get_output(true).await.unwrap(), json!([2]));
        assert!(matches!(backend.get_output(false).await, Err(BackendError::TaskNotStarted)));
        assert!(matches!(backend.get_output(true).await, Err(BackendError::TaskNotStarted)));
    }

    #[tokio::test]
    async fn test_completed_unread_blocks_submission() {
        let mut backend = started(Options::default()).await;
        backend
            .sapply(vec![json!(1)], slow_inc(Duration::ZERO), vec![])
            .await
            .unwrap();
        backend.session().unwrap().poll_status(None).await.unwrap();

        assert!(backend.task_state().await.unwrap().is_completed());
        assert!(matches!(
            backend.sapply(vec![json!(1)], slow_inc(Duration::ZERO), vec![]).await,
            Err(BackendError::TaskCompletedUnread)
        ));
        backend.get_output(false).await.unwrap();
        assert!(backend.task_state().await.unwrap().not_started());
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let mut backend = started(Options::default()).await;
        let items: Vec<Value> = (0..57).map(|i| json!(i)).collect();
        let square = WorkFn::arc("square", |x: &Value, _ctx: &NodeContext<'_>| {
            let n = x.as_i64().unwrap_or_default();
            Ok(json!(n * n))
        });
        backend.lapply(items, square, vec![]).await.unwrap();

        let expected: Vec<Value> = (0..57i64).map(|i| json!(i * i)).collect();
        assert_eq!(backend.get_output(true).await.unwrap(), Value::Array(expected));
    }

    #[tokio::test]
    async fn test_export_then_evaluate_on_every_node() {
        let backend = started(Options::default()).await;
        let mut env = Namespace::new();
        env.insert("v".into(), json!(5));

        backend.export(&["v"], &env).await.unwrap();
        assert_eq!(backend.evaluate(Expr::get("v")).await.unwrap(), vec![json!(5), json!(5)]);
        assert_eq!(backend.peek().await.unwrap(), vec![vec!["v".to_string()]; 2]);

        assert!(matches!(
            backend.export(&["missing"], &env).await,
            Err(BackendError::NameNotFound { .. })
        ));

        backend.clear().await.unwrap();
        backend.clear().await.unwrap();
        assert_eq!(backend.peek().await.unwrap(), vec![Vec::<String>::new(); 2]);
    }

    #[tokio::test]
    async fn test_worker_error_is_reraised_verbatim() {
        let mut backend = started(Options::default()).await;
        let picky = WorkFn::arc("picky", |x: &Value, _ctx: &NodeContext<'_>| {
            if x == &json!(2) {
                Err(TaskError::fail("item 2 exploded"))
            } else {
                Ok(x.clone())
            }
        });
        backend
            .sapply(vec![json!(1), json!(2), json!(3)], picky, vec![])
            .await
            .unwrap();

        match backend.get_output(true).await {
            Err(BackendError::Task(e)) => assert_eq!(e, TaskError::fail("item 2 exploded")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(backend.task_state().await.unwrap().not_started());
    }

    #[tokio::test]
    async fn test_busy_stop_is_refused_without_forceful() {
        let mut backend = started(Options::default()).await;
        backend
            .sapply(vec![json!(1), json!(2)], slow_inc(Duration::from_millis(100)), vec![])
            .await
            .unwrap();

        match backend.stop().await {
            Err(BackendError::BusyBackendStopNotAllowed { state }) => {
                assert_eq!(state, TaskState::Running)
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(backend.is_active());
        backend.get_output(true).await.unwrap();
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_forceful_stop_abandons_task() {
        let options = Options {
            stop_forceful: true,
            ..Options::default()
        };
        let mut backend = started(options).await;
        let mut events = backend.bus().subscribe();
        backend
            .sapply(vec![json!(1), json!(2)], slow_inc(Duration::from_millis(200)), vec![])
            .await
            .unwrap();

        backend.stop().await.unwrap();
        assert!(!backend.is_active());

        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(kinds, vec![EventKind::TaskSubmitted, EventKind::BackendStopped]);
    }

    #[tokio::test]
    async fn test_start_publishes_spec_warnings() {
        let mut backend = AsyncBackend::new(Options::default());
        let mut events = backend.bus().subscribe();

        let mut spec = Specification::new();
        spec.set_cores_with(1, 8).unwrap();
        spec.set_type_for(Some("MPI"), true);
        backend.start(&spec).await.unwrap();

        let mut warnings = Vec::new();
        let mut started_nodes = None;
        while let Ok(ev) = events.try_recv() {
            match ev.kind {
                EventKind::Warning => warnings.extend(ev.warning),
                EventKind::BackendStarted => started_nodes = ev.total,
                _ => {}
            }
        }
        assert_eq!(warnings.len(), 2);
        assert_eq!(started_nodes, Some(2));
    }

    #[tokio::test]
    async fn test_completed_unread_stop_is_refused_without_forceful() {
        let mut backend = started(Options::default()).await;
        backend
            .sapply(vec![json!(1)], slow_inc(Duration::ZERO), vec![])
            .await
            .unwrap();
        while !backend.task_state().await.unwrap().is_completed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        match backend.stop().await {
            Err(BackendError::BusyBackendStopNotAllowed { state }) => {
                assert_eq!(state, TaskState::Completed)
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(backend.is_active());
        assert_eq!(backend.get_output(false).await.unwrap(), json!([2]));
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_timeout_still_deactivates() {
        let options = Options {
            stop_timeout: Duration::from_millis(50),
            ..Options::default()
        };
        let factory = Arc::new(SlowShutdownFactory(Duration::from_millis(500)));
        let mut backend = AsyncBackend::with_factory(options, factory);
        backend.start(&two_cores()).await.unwrap();
        let mut events = backend.bus().subscribe();

        match backend.stop().await {
            Err(BackendError::StopTimedOut { timeout }) => {
                assert_eq!(timeout, Duration::from_millis(50))
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!backend.is_active());
        assert!(matches!(backend.peek().await, Err(BackendError::ClusterNotActive)));

        let ev = events.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::BackendStopped);
        assert!(ev.reason.is_some());
    }

    struct Sticky;

    impl ClusterFactory for Sticky {
        fn create(&self, spec: &Specification) -> Result<Arc<dyn Cluster>, ClusterError> {
            let cluster = crate::cluster::LocalCluster::start(spec.cores(), ClusterKind::Psock)?;
            cluster.export(Namespace::from([("stale".to_string(), json!(true))]))?;
            Ok(Arc::new(cluster))
        }
    }

    #[tokio::test]
    async fn test_start_sanitizes_fresh_cluster() {
        let mut backend = AsyncBackend::with_factory(Options::default(), Arc::new(Sticky));
        backend.start(&two_cores()).await.unwrap();
        assert_eq!(backend.peek().await.unwrap(), vec![Vec::<String>::new(); 2]);
    }
}
