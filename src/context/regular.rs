use async_trait::async_trait;

use crate::backend::{Backend, BackendKind, Operation, TaskState};
use crate::error::BackendError;
use crate::events::Bus;
use crate::spec::Specification;
use crate::value::{Namespace, Value};
use crate::work::Expr;

/// Passthrough decorator: every call goes straight to the backend.
pub struct Context<B> {
    inner: B,
}

impl<B: Backend> Context<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    /// Returns the decorated backend.
    pub fn into_inner(self) -> B {
        self.inner
    }
}

#[async_trait]
impl<B: Backend> Backend for Context<B> {
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
        self.inner.submit(op).await
    }

    async fn get_output(&mut self, wait: bool) -> Result<Value, BackendError> {
        self.inner.get_output(wait).await
    }

    async fn task_state(&self) -> Result<TaskState, BackendError> {
        self.inner.task_state().await
    }
}
