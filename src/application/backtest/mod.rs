pub mod holdout;
pub mod reporting;
pub mod walk_forward;

pub use holdout::{HoldoutConfig, HoldoutEvaluator};
pub use walk_forward::{WalkForwardConfig, WalkForwardEvaluator, WalkForwardResult};
