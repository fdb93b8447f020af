//! # batchvisor
//!
//! **Batchvisor** runs parallel maps over a pool of worker nodes hosted in a
//! background session, so the caller stays responsive while a batch runs.
//!
//! It provides backends that own a cluster, contexts that decorate a backend
//! (for example with progress bars), and a small functional API on top.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   par_sapply / par_lapply / par_apply          start_backend / stop_backend
//!            │                                            │
//!            ▼                                            ▼
//! ┌───────────────────────────────┐        ┌─────────────────────────────┐
//! │ ContextFactory                │        │ BackendFactory / Builder    │
//! │  - Context (pass-through)     │ wraps  │  - AsyncBackend             │
//! │  - ProgressTrackingContext ───┼───────►│  - SyncBackend              │
//! │      bar + temp progress log  │        │  - Bus (broadcast events)   │
//! └───────────────────────────────┘        └──────┬──────────────────────┘
//!                                                 │ owns
//!                                                 ▼
//!                                  ┌─────────────────────────────┐
//!                                  │ WorkerSession (actor task)  │
//!                                  │  status: Idle/Busy/Finished │
//!                                  │  one pending background job │
//!                                  └──────┬──────────────────────┘
//!                                         │ spawn_blocking
//!                                         ▼
//!                                  ┌─────────────────────────────┐
//!                                  │ Cluster (LocalCluster)      │
//!                                  │  node 0 │ node 1 │ node N   │
//!                                  └─────────────────────────────┘
//!
//! Bus ──► SubscriberSet ──► per-subscriber queue ──► Subscribe::on_event()
//! ```
//!
//! ### Task lifecycle (async backend)
//! ```text
//! submit(op) ──► TaskState::Running ──► TaskState::Completed ──► get_output()
//!    │                 │                                            │
//!    │                 └─ submit again ─► BackendBusy               │
//!    └─ unread output ─► TaskCompletedUnread        ◄── NotStarted ─┘
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types / traits                              |
//! |-------------------|---------------------------------------------------------|-------------------------------------------------|
//! | **Backends**      | Own a cluster and run one batch at a time.              | [`Backend`], [`AsyncBackend`], [`SyncBackend`]  |
//! | **Contexts**      | Decorate a backend; progress bars over a temp log.      | [`ContextFactory`], [`ProgressTrackingContext`] |
//! | **Work**          | User functions and expressions shipped to nodes.        | [`Work`], [`WorkFn`], [`Expr`]                  |
//! | **Validation**    | Core count and cluster type with auto-correction.       | [`Specification`], [`Warning`]                  |
//! | **Progress bars** | Basic text bar or an `indicatif` bar.                   | [`Bar`], [`BarFactory`], [`BarConfig`]          |
//! | **Events**        | Lifecycle events fanned out to subscribers.             | [`Event`], [`Subscribe`], [`SubscriberSet`]     |
//! | **Errors**        | Typed errors; worker errors surface verbatim.           | [`BackendError`], [`TaskError`]                 |
//! | **Configuration** | Global knobs passed by value.                           | [`Options`]                                     |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust,no_run
//! use batchvisor::{Options, Value, WorkFn, NodeContext, par_sapply, start_backend, stop_backend};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let opts = Options::default();
//!     let (_spec, mut backend) = start_backend(2, None, "async", &opts).await?;
//!
//!     let square = WorkFn::arc("square", |x: &Value, _ctx: &NodeContext<'_>| {
//!         let n = x.as_i64().unwrap_or_default();
//!         Ok(json!(n * n))
//!     });
//!     let items = (1..=10).map(|i| json!(i)).collect();
//!     let out = par_sapply(Some(backend.as_mut()), items, square, vec![], &opts).await?;
//!     println!("{out}");
//!
//!     stop_backend(backend.as_mut()).await?;
//!     Ok(())
//! }
//! ```
mod api;
mod backend;
mod bar;
mod cluster;
mod context;
mod error;
mod events;
mod options;
mod session;
mod spec;
mod subscribers;
mod value;
mod warning;
mod work;

// ---- Public re-exports ----

pub use api::{configure_bar, par_apply, par_lapply, par_sapply, start_backend, stop_backend};
pub use backend::{
    AsyncBackend, Backend, BackendBuilder, BackendFactory, BackendKind, Operation, SyncBackend,
    TaskState,
};
pub use bar::{
    Bar, BarConfig, BarConfigs, BarFactory, BarKind, BasicBar, BasicBarConfig, ModernBar,
    ModernBarConfig,
};
pub use cluster::{Cluster, ClusterError, ClusterFactory, LocalCluster, LocalClusterFactory, split_ranges};
pub use context::{Context, ContextFactory, ContextKind, ProgressTrackingContext};
pub use error::{BackendError, ConfigError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use options::Options;
pub use session::{CallOutcome, PollStatus, SessionError, SessionHost, SessionStatus, WorkerSession};
pub use spec::{ClusterKind, Specification, available_cores};
pub use subscribers::{Subscribe, SubscriberSet};
pub use value::{Margin, Matrix, Namespace, Value};
pub use warning::Warning;
pub use work::{Expr, NodeContext, Work, WorkFn, WorkRef};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
