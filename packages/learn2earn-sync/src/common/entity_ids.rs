//! Typed ID definitions for the entities this service touches.

pub use super::id::Id;

/// Marker type for Learn2Earn opportunity records.
pub struct Learn2Earn;

/// Marker type for audit log entries.
pub struct AdminLog;

/// Typed ID for Learn2Earn opportunities.
pub type Learn2EarnId = Id<Learn2Earn>;

/// Typed ID for audit log entries.
pub type AdminLogId = Id<AdminLog>;
