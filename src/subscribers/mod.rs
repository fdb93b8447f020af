//! # Event subscribers for backend events.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`]
//! fan-out, and built-in implementations for handling events broadcast
//! through the [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Backend / Context ── publish(Event) ──► Bus ──► listener
//!                                                     │
//!                                                     └──► SubscriberSet::emit
//!                                                              │
//!                                                     ┌────────┼─────────┐
//!                                                     ▼        ▼         ▼
//!                                                 LogWriter  Custom     ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use batchvisor::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct ProgressMetrics;
//!
//! #[async_trait]
//! impl Subscribe for ProgressMetrics {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ProgressAbandoned {
//!             // increment a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "progress-metrics"
//!     }
//! }
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod embedded;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
