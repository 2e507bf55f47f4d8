//! Two-way sync between the local and remote product stores.
//!
//! The [`Reconciler`] pushes one store into another with last-write-wins per
//! record. The [`SyncCoordinator`] exposes the two directions to clients and
//! keeps at most one run per direction in flight.

mod coordinator;
mod reconciler;

pub use coordinator::{SyncCoordinator, SyncReport};
pub use reconciler::{plan, Reconciler};
