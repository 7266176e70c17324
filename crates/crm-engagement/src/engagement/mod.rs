pub mod domain;
mod ranking;
mod score;
mod status;

pub use domain::{ActivityRollup, IntegrityFault, PrincipalId, PrincipalRollup, RollupField};
pub use ranking::{evaluate, evaluate_batch, rank, EngagementFilter, PrincipalEngagement};
pub use score::{
    breakdown, score, EngagementScore, ScoreBreakdown, ScoreComponent, WeightedComponent,
};
pub use status::{
    classify, elapsed_days, ActivityStatus, ParseActivityStatusError, StatusDisplay,
    ACTIVE_WINDOW_DAYS, MODERATE_WINDOW_DAYS,
};
