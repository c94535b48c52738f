pub mod planner;
pub mod split;

pub use planner::BatchPlanner;
pub use split::{segment_count, split, split_owned};
