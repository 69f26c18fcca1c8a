//! Kernel module - infrastructure and dependencies for the sync.

pub mod clock;
pub mod deps;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;

pub use clock::SystemClock;
pub use deps::SyncDeps;
pub use scheduled_tasks::{run_with_retries, start_scheduler};
pub use test_dependencies::{FixedClock, MemoryOpportunityStore};
pub use traits::*;
