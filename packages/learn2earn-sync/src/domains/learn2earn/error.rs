use thiserror::Error;

use crate::common::Learn2EarnId;

/// Errors raised by the status sync
///
/// The underlying store error is kept as the `source`, not repeated in the
/// message; print with `{:#}` through anyhow to see the chain.
#[derive(Error, Debug)]
pub enum SyncError {
    /// `after` is the last record read successfully, if any
    #[error("Failed to read opportunities")]
    Scan {
        after: Option<Learn2EarnId>,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to update status of opportunity {id}")]
    Update {
        id: Learn2EarnId,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write audit entry for opportunity {id}")]
    Audit {
        id: Learn2EarnId,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unknown completion policy: {0} (expected \"terminal\" or \"rederive\")")]
    InvalidPolicy(String),
}
