use std::fmt;
use std::sync::Arc;

use crate::error::TaskError;
use crate::value::{Namespace, Value};

type ExprFn = dyn Fn(&mut Namespace) -> Result<Value, TaskError> + Send + Sync;

/// Expression evaluated identically on every node.
///
/// The expression receives the node's namespace mutably, so it can both read
/// and bind names.
///
/// ## Example
/// ```
/// use batchvisor::{Expr, Namespace, Value};
///
/// let mut ns = Namespace::new();
/// Expr::assign("v", Value::from(5)).eval(&mut ns).unwrap();
/// assert_eq!(Expr::get("v").eval(&mut ns).unwrap(), Value::from(5));
/// assert!(Expr::get("missing").eval(&mut ns).is_err());
/// ```
#[derive(Clone)]
pub struct Expr {
    f: Arc<ExprFn>,
}

impl Expr {
    /// Wraps an arbitrary closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Namespace) -> Result<Value, TaskError> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Reads a bound name; fails when it is unbound.
    pub fn get(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |ns| {
            ns.get(&name)
                .cloned()
                .ok_or_else(|| TaskError::fail(format!("object '{name}' not found")))
        })
    }

    /// Binds `name` to `value` and returns the value.
    pub fn assign(name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        Self::new(move |ns| {
            ns.insert(name.clone(), value.clone());
            Ok(value.clone())
        })
    }

    /// Evaluates the expression against one namespace.
    pub fn eval(&self, ns: &mut Namespace) -> Result<Value, TaskError> {
        (self.f)(ns)
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Expr(..)")
    }
}
