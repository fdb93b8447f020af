//! # Work abstractions.
//!
//! This module provides the user-code types shipped to cluster nodes:
//! - [`Work`] - trait for a function mapped over the items of a batch
//! - [`WorkFn`] - closure-backed implementation
//! - [`WorkRef`] - shared reference to work (`Arc<dyn Work>`)
//! - [`NodeContext`] - what a node exposes to work while it runs
//! - [`Expr`] - expression evaluated identically on every node

mod context;
mod expr;
mod work;
mod work_fn;

pub use context::NodeContext;
pub use expr::Expr;
pub use work::{Work, WorkRef};
pub use work_fn::WorkFn;
