//! Backend events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by backends and progress contexts.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: [`AsyncBackend`](crate::AsyncBackend), [`SyncBackend`](crate::SyncBackend),
//!   [`ProgressTrackingContext`](crate::ProgressTrackingContext).
//! - **Consumers**: the backend's subscriber listener (fans out to
//!   [`SubscriberSet`](crate::SubscriberSet)) and anyone holding
//!   [`Backend::bus`](crate::Backend::bus).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
