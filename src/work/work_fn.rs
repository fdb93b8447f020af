//! # Closure-backed work (`WorkFn`)
//!
//! [`WorkFn`] wraps a closure `F: Fn(&Value, &NodeContext) -> Result<Value, TaskError>`.
//! The closure is shared by every node, so it is `Fn` (not `FnMut`); use
//! `Arc<...>` with explicit synchronization inside the closure if state must
//! be shared between items.
//!
//! ## Example
//! ```rust
//! use batchvisor::{NodeContext, TaskError, Value, WorkFn, WorkRef};
//!
//! let inc: WorkRef = WorkFn::arc("inc", |x: &Value, _ctx: &NodeContext<'_>| {
//!     Ok::<_, TaskError>(Value::from(x.as_i64().unwrap_or(0) + 1))
//! });
//! assert_eq!(inc.name(), "inc");
//! assert!(!inc.is_primitive());
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::TaskError;
use crate::value::Value;
use crate::work::{NodeContext, Work};

/// Closure-backed work.
#[derive(Debug)]
pub struct WorkFn<F> {
    name: Cow<'static, str>,
    primitive: bool,
    f: F,
}

impl<F> WorkFn<F> {
    /// Creates instrumentable work.
    ///
    /// Prefer [`WorkFn::arc`] when you immediately need a [`WorkRef`](crate::WorkRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            primitive: false,
            f,
        }
    }

    /// Creates the work and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Creates opaque work that progress tracking refuses to decorate.
    pub fn primitive(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            primitive: true,
            f,
        })
    }
}

impl<F> Work for WorkFn<F>
where
    F: Fn(&Value, &NodeContext<'_>) -> Result<Value, TaskError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, item: &Value, ctx: &NodeContext<'_>) -> Result<Value, TaskError> {
        (self.f)(item, ctx)
    }

    fn is_primitive(&self) -> bool {
        self.primitive
    }
}
