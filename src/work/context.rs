use tokio_util::sync::CancellationToken;

use crate::value::{Namespace, Value};

/// Node-side view handed to [`Work::call`](crate::Work::call).
///
/// Gives read access to the node's namespace (values placed there by
/// `export` or `evaluate`), the extra arguments of the current call, and the
/// cluster's shutdown signal.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    node: usize,
    args: &'a [Value],
    namespace: &'a Namespace,
    token: &'a CancellationToken,
}

impl<'a> NodeContext<'a> {
    /// Creates a context for `node`.
    pub fn new(
        node: usize,
        args: &'a [Value],
        namespace: &'a Namespace,
        token: &'a CancellationToken,
    ) -> Self {
        Self {
            node,
            args,
            namespace,
            token,
        }
    }

    /// Zero-based index of the node running the call.
    pub fn node(&self) -> usize {
        self.node
    }

    /// Extra arguments passed alongside the items.
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// Extra argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    /// Looks up a top-level name in the node's namespace.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.namespace.get(name)
    }

    /// The node's whole namespace.
    pub fn namespace(&self) -> &'a Namespace {
        self.namespace
    }

    /// True once the hosting cluster is shutting down.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
