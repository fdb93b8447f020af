use std::sync::Arc;

use crate::error::TaskError;
use crate::value::Value;
use crate::work::NodeContext;

/// # Function mapped over the items of a batch.
///
/// A `Work` has a stable [`name`](Work::name) and a synchronous
/// [`call`](Work::call) run once per item on a cluster node. Calls for
/// different items may run concurrently on different nodes, so
/// implementations must not rely on shared mutable state without
/// synchronizing it themselves.
///
/// # Example
/// ```
/// use batchvisor::{NodeContext, TaskError, Value, Work};
///
/// struct Double;
///
/// impl Work for Double {
///     fn name(&self) -> &str { "double" }
///
///     fn call(&self, item: &Value, _ctx: &NodeContext<'_>) -> Result<Value, TaskError> {
///         let n = item.as_i64().ok_or_else(|| TaskError::fail("not an integer"))?;
///         Ok(Value::from(n * 2))
///     }
/// }
/// ```
pub trait Work: Send + Sync + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Computes the result for one item.
    ///
    /// Long computations should check [`NodeContext::is_cancelled`] and bail
    /// out with [`TaskError::Canceled`].
    fn call(&self, item: &Value, ctx: &NodeContext<'_>) -> Result<Value, TaskError>;

    /// Whether this work is opaque and cannot be wrapped with instrumentation.
    ///
    /// Progress tracking refuses primitive work.
    fn is_primitive(&self) -> bool {
        false
    }
}

/// Shared handle to work.
pub type WorkRef = Arc<dyn Work>;
