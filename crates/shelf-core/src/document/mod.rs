//! Remote document store adapters.

pub mod codec;
mod firestore;
mod memory;

pub use codec::{Document, Fields};
pub use firestore::FirestoreStore;
pub use memory::MemoryDocumentStore;

/// Label of the remote store in logs and errors
pub const REMOTE_STORE: &str = "remote";
