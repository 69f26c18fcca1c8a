//! Dependencies for the sync (using traits for testability)
//!
//! Built once in `main` from an explicitly created store handle and passed
//! down. Nothing here is global.

use std::sync::Arc;

use super::{BaseClock, SystemClock};
use crate::domains::learn2earn::{BaseOpportunityStore, PgOpportunityStore};

#[derive(Clone)]
pub struct SyncDeps {
    pub store: Arc<dyn BaseOpportunityStore>,
    pub clock: Arc<dyn BaseClock>,
}

impl SyncDeps {
    pub fn new(store: Arc<dyn BaseOpportunityStore>, clock: Arc<dyn BaseClock>) -> Self {
        Self { store, clock }
    }

    /// Production wiring: Postgres store and the wall clock
    pub fn postgres(store: PgOpportunityStore) -> Self {
        Self::new(Arc::new(store), Arc::new(SystemClock))
    }
}
