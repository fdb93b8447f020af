//! # User API.
//!
//! Thin functions over the backend and context layers:
//!
//! ```text
//! start_backend(cores, type, "async") ──► Specification + Box<dyn Backend>
//! par_sapply(Some(&mut backend), ..)  ──► [ProgressTrackingContext] ─► submit ─► get_output(wait)
//! par_sapply(None, ..)                ──► sequential map in-process
//! stop_backend(&mut backend)
//! ```

use crate::backend::{Backend, BackendFactory, Operation};
use crate::bar::{BarConfig, BarKind};
use crate::cluster::ClusterError;
use crate::context::{ContextFactory, ContextKind};
use crate::error::BackendError;
use crate::options::Options;
use crate::spec::Specification;
use crate::value::{Margin, Matrix, Value};
use crate::work::WorkRef;

/// Validates a specification and starts a backend of `backend_type` on it.
///
/// Corrections made while validating are logged and kept in
/// [`Specification::warnings`]; the backend also publishes them on its bus.
pub async fn start_backend(
    cores: usize,
    cluster_type: Option<&str>,
    backend_type: &str,
    options: &Options,
) -> Result<(Specification, Box<dyn Backend>), BackendError> {
    let mut spec = Specification::new();
    spec.set_cores(cores)?;
    spec.set_type(cluster_type);

    let mut backend = BackendFactory::get(backend_type, options)?;
    backend.start(&spec).await?;
    Ok((spec, backend))
}

/// Stops a backend.
pub async fn stop_backend(backend: &mut dyn Backend) -> Result<(), BackendError> {
    backend.stop().await
}

/// Maps `work` over `items` and simplifies the results.
///
/// Without a backend the map runs sequentially in-process.
pub async fn par_sapply(
    backend: Option<&mut dyn Backend>,
    items: Vec<Value>,
    work: WorkRef,
    args: Vec<Value>,
    options: &Options,
) -> Result<Value, BackendError> {
    run(backend, Operation::sapply(items, work, args), options).await
}

/// Maps `work` over `items`, returning the plain list of results.
pub async fn par_lapply(
    backend: Option<&mut dyn Backend>,
    items: Vec<Value>,
    work: WorkRef,
    args: Vec<Value>,
    options: &Options,
) -> Result<Value, BackendError> {
    run(backend, Operation::lapply(items, work, args), options).await
}

/// Maps `work` over the rows, columns or cells of `matrix`.
pub async fn par_apply(
    backend: Option<&mut dyn Backend>,
    matrix: Matrix,
    margin: Margin,
    work: WorkRef,
    args: Vec<Value>,
    options: &Options,
) -> Result<Value, BackendError> {
    run(backend, Operation::apply(matrix, margin, work, args), options).await
}

/// Selects the bar kind and, when given, replaces its default configuration.
pub fn configure_bar(options: &mut Options, kind: BarKind, config: Option<BarConfig>) {
    options.progress_bar_type = kind;
    if let Some(config) = config {
        options.progress_bar_config.set(config);
    }
}

async fn run(
    backend: Option<&mut dyn Backend>,
    op: Operation,
    options: &Options,
) -> Result<Value, BackendError> {
    let Some(backend) = backend else {
        let joined = tokio::task::spawn_blocking(move || op.run_local())
            .await
            .map_err(|e| ClusterError::Crashed {
                reason: e.to_string(),
            })?;
        return Ok(joined?);
    };

    let kind = if options.progress_track && backend.supports_progress() {
        ContextKind::Progress
    } else {
        ContextKind::Regular
    };
    let mut ctx = ContextFactory::wrap(kind, backend, options);
    ctx.submit(op).await?;
    ctx.get_output(true).await
}
