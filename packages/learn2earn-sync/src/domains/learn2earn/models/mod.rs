pub mod admin_log;
pub mod learn2earn;

pub use admin_log::{AdminLog, STATUS_SYNC_ACTION};
pub use learn2earn::{Learn2Earn, Learn2EarnStatus};
