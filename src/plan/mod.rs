//! Destination planning: where each dated file goes, grouped by capture date.

mod group;
mod path;

pub use group::{build_plan, group_by_date, BucketPlan, DateBucket, MovePlan, MoveStatus, PlanSet};
pub use path::{date_dir, destination, kind_dir, plan, PlanError};
