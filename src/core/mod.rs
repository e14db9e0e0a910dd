mod display;
mod engine;
mod error;
mod money;
mod solver;
mod types;

pub use display::{calculate_progress, format_currency};
pub use engine::{annuity_future_value, project_future_value};
pub use error::EngineError;
pub use solver::{reproject_after_lump_sum, solve_required_contribution};
pub use types::{
    ExistingPlan, FutureValue, FutureValueParams, GoalSpec, LumpSumReprojection,
    ProjectionResult, YearRecord,
};
