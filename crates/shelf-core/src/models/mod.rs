//! Data models for Shelf

mod outcome;
mod product;
mod sync_conflict;
mod sync_run;

pub use outcome::{SyncAction, SyncDirection, SyncFailure, SyncOutcome};
pub use product::{
    from_unix_millis, now_millis, parse_timestamp, truncate_to_millis, Product, ProductKey,
    MAX_RATING,
};
pub use sync_conflict::{SyncConflict, LWW_STRATEGY};
pub use sync_run::SyncRun;
