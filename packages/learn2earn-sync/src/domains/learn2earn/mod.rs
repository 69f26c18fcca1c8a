//! Learn2Earn domain - opportunity lifecycle and the daily status sync.

pub mod error;
pub mod models;
pub mod status;
pub mod store;
pub mod sync;

pub use error::SyncError;
pub use models::{AdminLog, Learn2Earn, Learn2EarnStatus, STATUS_SYNC_ACTION};
pub use status::{derive_status, resolve_transition, CompletionPolicy, Transition};
pub use store::{BaseOpportunityStore, PgOpportunityStore};
pub use sync::{StatusChange, StatusSynchronizer, SyncReport};
