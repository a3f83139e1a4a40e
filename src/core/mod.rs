mod adjustments;
mod engine;
mod solver;
mod types;
mod units;

pub use adjustments::{AdjustmentSchedule, CategoryVisibility};
pub use engine::{
    compare_with_baseline, net_savings_at, project, required_spending_at, try_project,
};
pub use solver::{
    GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalType, SolveError, solve_goal,
};
pub use types::{
    Category, FiResult, FlowDirection, MAX_PROJECTION_YEARS, PRE_RETIREMENT_YEARS,
    ParameterError, ProjectionStatus, ScenarioComparison, SimulationParameters,
    SpendingAdjustment, TimeUnit, TrajectoryPoint, validate_adjustments,
};
pub use units::{from_annual, to_annual};
