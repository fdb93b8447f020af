//! # Example: Tracked parallel map
//!
//! Starts an async backend with the built-in [`LogWriter`] subscriber, runs a
//! slow `sapply` behind a progress bar, then shows the worker error path.
//!
//! Run with `cargo run --example progress --features logging`.

use std::sync::Arc;
use std::time::Duration;

use batchvisor::{
    Backend, BackendBuilder, BackendKind, BarKind, LogWriter, NodeContext, Options, Specification,
    Subscribe, TaskError, Value, WorkFn, WorkRef, configure_bar, par_sapply,
};
use serde_json::json;

fn slow_square() -> WorkRef {
    WorkFn::arc("slow_square", |x: &Value, _ctx: &NodeContext<'_>| {
        std::thread::sleep(Duration::from_millis(30));
        let n = x.as_i64().unwrap_or_default();
        Ok(json!(n * n))
    })
}

fn unlucky() -> WorkRef {
    WorkFn::arc("unlucky", |x: &Value, _ctx: &NodeContext<'_>| {
        std::thread::sleep(Duration::from_millis(10));
        match x.as_i64() {
            Some(13) => Err(TaskError::fail("13 is unlucky")),
            _ => Ok(x.clone()),
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut opts = Options {
        progress_track: true,
        ..Options::default()
    };
    configure_bar(&mut opts, BarKind::Modern, None);

    let mut spec = Specification::new();
    spec.set_cores(4)?;
    spec.set_type(None);

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let mut backend = BackendBuilder::new(BackendKind::Async, opts.clone())
        .with_subscribers(subs)
        .build();
    backend.start(&spec).await?;

    let items: Vec<Value> = (1..=60).map(|i| json!(i)).collect();
    let squares = par_sapply(Some(backend.as_mut()), items, slow_square(), vec![], &opts).await?;
    println!("squares: {squares}");

    configure_bar(&mut opts, BarKind::Basic, None);
    let items: Vec<Value> = (1..=20).map(|i| json!(i)).collect();
    match par_sapply(Some(backend.as_mut()), items, unlucky(), vec![], &opts).await {
        Ok(out) => println!("unexpected success: {out}"),
        Err(e) => println!("worker error surfaced as-is: {e}"),
    }

    backend.stop().await?;
    Ok(())
}
