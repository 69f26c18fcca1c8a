pub mod entity_ids;
pub mod id;
pub mod timestamp;

pub use entity_ids::*;
pub use timestamp::parse_timestamp;
