//! # ProgressTrackingContext: progress bar over a backend submission.
//!
//! Decorates `sapply`/`lapply`/`apply` with a visual side channel; the
//! result path is untouched and the caller still reads it with
//! `get_output`.
//!
//! ## Flow
//! ```text
//! submit(op)
//!   ├─► primitive work?             → PrimitiveTaskNotAllowed
//!   ├─► backend without progress?   → Warning, plain submit
//!   ├─► ProgressLog::create         → TemporaryFileCreationFailed (nothing submitted)
//!   ├─► inner.submit(op + TrackedWork)
//!   └─► loop every progress_timeout:
//!         ticks = log.poll().min(total)
//!         ├─► ticks grew   → bar.update(ticks), unproductive = 0
//!         ├─► ticks==total → done
//!         └─► unproductive > threshold && task Completed → abandoned
//!       bar.terminate(), log removed
//! ```
//!
//! ## Rules
//! - Values passed to `Bar::update` are non-decreasing and bounded by the total.
//! - The early exit needs **both** a flat tick count and a completed task, so a
//!   slow item never ends tracking on its own.

use std::sync::Arc;

use async_trait::async_trait;

use super::log::{ProgressLog, TrackedWork};
use crate::backend::{Backend, BackendKind, Operation, TaskState};
use crate::bar::{Bar, BarFactory, BarKind};
use crate::error::BackendError;
use crate::events::{Bus, Event, EventKind};
use crate::options::Options;
use crate::spec::Specification;
use crate::value::{Namespace, Value};
use crate::warning::Warning;
use crate::work::Expr;

type BarMaker = dyn Fn(BarKind) -> Box<dyn Bar> + Send + Sync;

/// How a tracking loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Finished,
    Abandoned,
}

/// Terminates the bar on every exit path.
struct BarGuard(Box<dyn Bar>);

impl Drop for BarGuard {
    fn drop(&mut self) {
        self.0.terminate();
    }
}

/// Decorator that renders the progress of each submission.
pub struct ProgressTrackingContext<B> {
    inner: B,
    options: Options,
    bars: Arc<BarMaker>,
}

impl<B: Backend> ProgressTrackingContext<B> {
    /// Decorates `inner`; bars come from [`BarFactory`].
    pub fn new(inner: B, options: Options) -> Self {
        Self {
            inner,
            options,
            bars: Arc::new(BarFactory::get),
        }
    }

    /// Replaces the bar constructor.
    pub fn with_bars<F>(mut self, bars: F) -> Self
    where
        F: Fn(BarKind) -> Box<dyn Bar> + Send + Sync + 'static,
    {
        self.bars = Arc::new(bars);
        self
    }

    /// Returns the decorated backend.
    pub fn into_inner(self) -> B {
        self.inner
    }

    fn event(&self, kind: EventKind, total: usize) -> Event {
        Event::new(kind)
            .with_backend(self.inner.kind().as_str())
            .with_total(total)
    }

    async fn track(&self, log: &mut ProgressLog, total: usize) -> Result<(), BackendError> {
        let mut bar = BarGuard((self.bars)(self.options.progress_bar_type));
        bar.0.create(total, 0, &self.options.bar_config());
        self.inner.bus().publish(self.event(EventKind::ProgressStarted, total));

        let interval = self.options.poll_interval();
        let threshold = self.options.unproductive_threshold();
        let mut current = 0usize;
        let mut unproductive = 0u32;

        let outcome = loop {
            if current >= total {
                break Outcome::Finished;
            }
            tokio::time::sleep(interval).await;

            let ticks = match log.poll() {
                Ok(ticks) => ticks.min(total),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read progress log");
                    current
                }
            };
            if ticks > current {
                current = ticks;
                unproductive = 0;
                bar.0.update(current);
                self.inner
                    .bus()
                    .publish(self.event(EventKind::ProgressAdvanced, total).with_current(current));
                continue;
            }

            unproductive = unproductive.saturating_add(1);
            if unproductive > threshold && self.inner.task_state().await?.is_completed() {
                break Outcome::Abandoned;
            }
        };

        drop(bar);
        let kind = match outcome {
            Outcome::Finished => EventKind::ProgressFinished,
            Outcome::Abandoned => {
                tracing::debug!(current, total, "progress tracking ended before every tick");
                EventKind::ProgressAbandoned
            }
        };
        self.inner
            .bus()
            .publish(self.event(kind, total).with_current(current));
        Ok(())
    }
}

#[async_trait]
impl<B: Backend> Backend for ProgressTrackingContext<B> {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn supports_progress(&self) -> bool {
        self.inner.supports_progress()
    }

    fn bus(&self) -> &Bus {
        self.inner.bus()
    }

    async fn start(&mut self, spec: &Specification) -> Result<(), BackendError> {
        self.inner.start(spec).await
    }

    async fn stop(&mut self) -> Result<(), BackendError> {
        self.inner.stop().await
    }

    async fn clear(&self) -> Result<(), BackendError> {
        self.inner.clear().await
    }

    async fn peek(&self) -> Result<Vec<Vec<String>>, BackendError> {
        self.inner.peek().await
    }

    async fn export(&self, names: &[&str], env: &Namespace) -> Result<(), BackendError> {
        self.inner.export(names, env).await
    }

    async fn evaluate(&self, expr: Expr) -> Result<Vec<Value>, BackendError> {
        self.inner.evaluate(expr).await
    }

    async fn submit(&mut self, op: Operation) -> Result<(), BackendError> {
        let work = Arc::clone(op.work());
        if work.is_primitive() {
            return Err(BackendError::PrimitiveTaskNotAllowed {
                name: work.name().to_string(),
            });
        }

        if !self.inner.supports_progress() {
            let warning = Warning::ProgressNotSupportedForBackend {
                backend: self.inner.kind().as_str(),
            };
            warning.log();
            self.inner
                .bus()
                .publish(Event::warning(warning).with_backend(self.inner.kind().as_str()));
            return self.inner.submit(op).await;
        }

        let mut log = ProgressLog::create(self.options.progress_log_dir.as_deref())
            .map_err(|source| BackendError::TemporaryFileCreationFailed { source })?;
        let total = op.total();
        let tracked = TrackedWork::arc(work, log.path());

        self.inner.submit(op.with_work(tracked)).await?;
        // The task is in flight; its result still comes through get_output.
        if let Err(e) = self.track(&mut log, total).await {
            tracing::warn!(error = %e, "progress tracking failed");
        }
        Ok(())
    }

    async fn get_output(&mut self, wait: bool) -> Result<Value, BackendError> {
        self.inner.get_output(wait).await
    }

    async fn task_state(&self) -> Result<TaskState, BackendError> {
        self.inner.task_state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AsyncBackend, SyncBackend};
    use crate::bar::BarConfig;
    use crate::error::TaskError;
    use crate::work::{NodeContext, WorkFn, WorkRef};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorded {
        created: Option<(usize, usize)>,
        updates: Vec<usize>,
        terminated: usize,
    }

    struct RecordingBar(Arc<Mutex<Recorded>>);

    impl Bar for RecordingBar {
        fn create(&mut self, total: usize, initial: usize, _config: &BarConfig) {
            self.0.lock().unwrap().created = Some((total, initial));
        }

        fn update(&mut self, current: usize) {
            self.0.lock().unwrap().updates.push(current);
        }

        fn terminate(&mut self) {
            self.0.lock().unwrap().terminated += 1;
        }
    }

    fn fast_options(dir: &tempfile::TempDir) -> Options {
        Options {
            progress_timeout: Duration::from_millis(1),
            progress_wait: Duration::from_millis(20),
            progress_log_dir: Some(dir.path().to_path_buf()),
            ..Options::default()
        }
    }

    fn spec(cores: usize) -> Specification {
        let mut spec = Specification::new();
        spec.set_cores_with(cores, 8).unwrap();
        spec.set_type_for(Some("psock"), true);
        spec
    }

    fn tracked<B: Backend>(backend: B, options: Options) -> (ProgressTrackingContext<B>, Arc<Mutex<Recorded>>) {
        let record = Arc::new(Mutex::new(Recorded::default()));
        let shared = Arc::clone(&record);
        let ctx = ProgressTrackingContext::new(backend, options)
            .with_bars(move |_| -> Box<dyn Bar> { Box::new(RecordingBar(Arc::clone(&shared))) });
        (ctx, record)
    }

    fn log_files(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_updates_are_monotonic_and_bounded() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut backend = AsyncBackend::new(Options::default());
        backend.start(&spec(2)).await.unwrap();

        let (mut ctx, record) = tracked(&mut backend, fast_options(&dir));
        let slow = WorkFn::arc("slow", |x: &Value, _ctx: &NodeContext<'_>| {
            std::thread::sleep(Duration::from_millis(2));
            Ok(x.clone())
        });
        let items: Vec<Value> = (0..40).map(|i| json!(i)).collect();
        ctx.sapply(items.clone(), slow, vec![]).await.unwrap();
        assert_eq!(ctx.get_output(true).await.unwrap(), Value::Array(items));

        let record = record.lock().unwrap();
        assert_eq!(record.created, Some((40, 0)));
        assert!(record.updates.windows(2).all(|w| w[0] <= w[1]));
        assert!(record.updates.iter().all(|u| *u <= 40));
        assert_eq!(record.updates.last(), Some(&40));
        assert_eq!(record.terminated, 1);
        assert_eq!(log_files(&dir), 0);
    }

    #[tokio::test]
    async fn test_failing_item_ends_tracking_and_error_surfaces() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut backend = AsyncBackend::new(Options::default());
        backend.start(&spec(3)).await.unwrap();
        let mut events = backend.bus().subscribe();

        let (mut ctx, record) = tracked(&mut backend, fast_options(&dir));
        let picky = WorkFn::arc("picky", |x: &Value, _ctx: &NodeContext<'_>| {
            match x.as_i64() {
                Some(50) => Err(TaskError::fail("item 50 exploded")),
                _ => Ok(x.clone()),
            }
        });
        let items: Vec<Value> = (1..=100).map(|i| json!(i)).collect();
        ctx.sapply(items, picky, vec![]).await.unwrap();

        match ctx.get_output(true).await {
            Err(BackendError::Task(e)) => assert_eq!(e, TaskError::fail("item 50 exploded")),
            other => panic!("unexpected: {other:?}"),
        }

        let record = record.lock().unwrap();
        assert!(record.updates.iter().all(|u| *u < 100));
        assert_eq!(record.terminated, 1);
        assert_eq!(log_files(&dir), 0);

        let mut abandoned = false;
        while let Ok(ev) = events.try_recv() {
            abandoned |= ev.kind == EventKind::ProgressAbandoned;
        }
        assert!(abandoned);
    }

    #[tokio::test]
    async fn test_primitive_work_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut backend = AsyncBackend::new(Options::default());
        backend.start(&spec(2)).await.unwrap();

        let (mut ctx, record) = tracked(&mut backend, fast_options(&dir));
        let prim: WorkRef = WorkFn::primitive("sum", |x: &Value, _ctx: &NodeContext<'_>| Ok(x.clone()));
        match ctx.sapply(vec![json!(1)], prim, vec![]).await {
            Err(BackendError::PrimitiveTaskNotAllowed { name }) => assert_eq!(name, "sum"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(record.lock().unwrap().created.is_none());
        assert!(ctx.task_state().await.unwrap().not_started());
    }

    #[tokio::test]
    async fn test_log_creation_failure_submits_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut backend = AsyncBackend::new(Options::default());
        backend.start(&spec(2)).await.unwrap();

        let options = Options {
            progress_log_dir: Some(dir.path().join("missing")),
            ..Options::default()
        };
        let (mut ctx, _record) = tracked(&mut backend, options);
        let id = WorkFn::arc("id", |x: &Value, _ctx: &NodeContext<'_>| Ok(x.clone()));
        assert!(matches!(
            ctx.sapply(vec![json!(1)], id, vec![]).await,
            Err(BackendError::TemporaryFileCreationFailed { .. })
        ));
        assert!(ctx.task_state().await.unwrap().not_started());
    }

    #[tokio::test]
    async fn test_sync_backend_warns_and_passes_through() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut backend = SyncBackend::new(Options::default());
        backend.start(&spec(2)).await.unwrap();
        let mut events = backend.bus().subscribe();

        let (mut ctx, record) = tracked(&mut backend, fast_options(&dir));
        let id = WorkFn::arc("id", |x: &Value, _ctx: &NodeContext<'_>| Ok(x.clone()));
        ctx.sapply(vec![json!(1), json!(2)], id, vec![]).await.unwrap();
        assert_eq!(ctx.get_output(false).await.unwrap(), json!([1, 2]));
        assert!(record.lock().unwrap().created.is_none());

        let ev = std::iter::from_fn(|| events.try_recv().ok())
            .find(|ev| ev.is_warning())
            .unwrap();
        assert_eq!(
            ev.warning,
            Some(Warning::ProgressNotSupportedForBackend { backend: "sync" })
        );
        assert_eq!(ev.backend.as_deref(), Some("sync"));
    }

    /// Delegates to an async backend but cannot report its task state.
    struct StateBlind<'a>(&'a mut AsyncBackend);

    #[async_trait]
    impl Backend for StateBlind<'_> {
        fn kind(&self) -> BackendKind {
            self.0.kind()
        }

        fn is_active(&self) -> bool {
            self.0.is_active()
        }

        fn supports_progress(&self) -> bool {
            true
        }

        fn bus(&self) -> &Bus {
            self.0.bus()
        }

        async fn start(&mut self, spec: &Specification) -> Result<(), BackendError> {
            self.0.start(spec).await
        }

        async fn stop(&mut self) -> Result<(), BackendError> {
            self.0.stop().await
        }

        async fn clear(&self) -> Result<(), BackendError> {
            self.0.clear().await
        }

        async fn peek(&self) -> Result<Vec<Vec<String>>, BackendError> {
            self.0.peek().await
        }

        async fn export(&self, names: &[&str], env: &Namespace) -> Result<(), BackendError> {
            self.0.export(names, env).await
        }

        async fn evaluate(&self, expr: Expr) -> Result<Vec<Value>, BackendError> {
            self.0.evaluate(expr).await
        }

        async fn submit(&mut self, op: Operation) -> Result<(), BackendError> {
            self.0.submit(op).await
        }

        async fn get_output(&mut self, wait: bool) -> Result<Value, BackendError> {
            self.0.get_output(wait).await
        }

        async fn task_state(&self) -> Result<TaskState, BackendError> {
            Err(BackendError::ClusterNotActive)
        }
    }

    #[tokio::test]
    async fn test_tracking_failure_keeps_submission_readable() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut backend = AsyncBackend::new(Options::default());
        backend.start(&spec(2)).await.unwrap();

        let (mut ctx, record) = tracked(StateBlind(&mut backend), fast_options(&dir));
        let slow = WorkFn::arc("slow", |x: &Value, _ctx: &NodeContext<'_>| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(x.clone())
        });
        ctx.sapply(vec![json!(7)], slow, vec![]).await.unwrap();
        assert_eq!(record.lock().unwrap().terminated, 1);
        assert_eq!(ctx.get_output(true).await.unwrap(), json!([7]));
        assert_eq!(log_files(&dir), 0);
    }

    #[tokio::test]
    async fn test_empty_input_finishes_immediately() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut backend = AsyncBackend::new(Options::default());
        backend.start(&spec(2)).await.unwrap();

        let (mut ctx, record) = tracked(&mut backend, fast_options(&dir));
        let id = WorkFn::arc("id", |x: &Value, _ctx: &NodeContext<'_>| Ok(x.clone()));
        ctx.lapply(vec![], id, vec![]).await.unwrap();
        assert_eq!(ctx.get_output(true).await.unwrap(), json!([]));
        assert_eq!(record.lock().unwrap().created, Some((0, 0)));
    }
}
