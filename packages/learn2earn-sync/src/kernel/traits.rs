// Trait definitions for dependency injection
//
// Infrastructure seams only. The storage seam lives next to the domain it
// serves (domains::learn2earn::store::BaseOpportunityStore).

use chrono::{DateTime, Utc};

// =============================================================================
// Clock Trait (Infrastructure)
// =============================================================================

pub trait BaseClock: Send + Sync {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}
