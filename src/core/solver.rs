use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::adjustments::AdjustmentSchedule;
use super::engine::project;
use super::types::{MAX_PROJECTION_YEARS, ParameterError, SimulationParameters};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalType {
    /// Smallest annual savings reaching FI by the target year.
    RequiredSavings,
    /// Largest annual expenses still reaching FI by the target year, savings unchanged.
    MaxExpenses,
}

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub target_fi_year: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub fi_year: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub target_fi_year: u32,
    pub solved_value: Option<f64>,
    pub achieved_fi_year: Option<u32>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolveError {
    #[error(transparent)]
    Parameters(#[from] ParameterError),
    #[error("target FI year must be <= {}, got {}", MAX_PROJECTION_YEARS, .0)]
    TargetBeyondHorizon(u32),
    #[error("search bounds must be finite")]
    NonFiniteBounds,
    #[error("search_max must be greater than search_min")]
    EmptySearchRange,
    #[error("search_min must be >= 0 when solving for expenses")]
    NegativeExpenseBound,
    #[error("tolerance must be > 0")]
    NonPositiveTolerance,
    #[error("max_iterations must be > 0")]
    NoIterations,
}

pub fn solve_goal(
    params: &SimulationParameters,
    schedule: &AdjustmentSchedule,
    config: GoalSolveConfig,
) -> Result<GoalSolveResult, SolveError> {
    validate_config(params, config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_eval = evaluate_candidate(params, schedule, config, config.search_min);
    let high_eval = evaluate_candidate(params, schedule, config, config.search_max);

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    // RequiredSavings succeeds above some threshold, MaxExpenses below one.
    let (already_met, out_of_reach) = match config.goal_type {
        GoalType::RequiredSavings => (low_eval.meets_target, !high_eval.meets_target),
        GoalType::MaxExpenses => (high_eval.meets_target, !low_eval.meets_target),
    };

    if out_of_reach {
        feasible = false;
        message = match config.goal_type {
            GoalType::RequiredSavings => "No feasible savings found within the search bounds.",
            GoalType::MaxExpenses => "No feasible expenses found within the search bounds.",
        }
        .to_string();
    } else if already_met {
        converged = true;
        feasible = true;
        match config.goal_type {
            GoalType::RequiredSavings => {
                solved_value = Some(config.search_min);
                message = "Already meets target at lower savings bound.".to_string();
            }
            GoalType::MaxExpenses => {
                solved_value = Some(config.search_max);
                message =
                    "Upper expense bound is still feasible; increase search max for a higher target."
                        .to_string();
            }
        }
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let eval = evaluate_candidate(params, schedule, config, mid);
            debug!(
                iteration = it,
                lower = lo,
                upper = hi,
                candidate = mid,
                fi_year = ?eval.fi_year,
                "goal solver step"
            );
            iterations.push(GoalSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_value: mid,
                fi_year: eval.fi_year,
            });

            match (config.goal_type, eval.meets_target) {
                (GoalType::RequiredSavings, true) | (GoalType::MaxExpenses, false) => hi = mid,
                (GoalType::RequiredSavings, false) | (GoalType::MaxExpenses, true) => lo = mid,
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }

        // Keep the bound that is known to satisfy the target.
        solved_value = Some(match config.goal_type {
            GoalType::RequiredSavings => hi,
            GoalType::MaxExpenses => lo,
        });
        feasible = true;
        message = match (converged, config.goal_type) {
            (true, GoalType::RequiredSavings) => "Solved required annual savings.".to_string(),
            (true, GoalType::MaxExpenses) => "Solved maximum annual expenses.".to_string(),
            (false, _) => {
                "Reached max iterations before tolerance was met; returning best estimate."
                    .to_string()
            }
        };
    }

    let achieved_fi_year = solved_value
        .and_then(|value| evaluate_candidate(params, schedule, config, value).fi_year);

    Ok(GoalSolveResult {
        goal_type: config.goal_type,
        target_fi_year: config.target_fi_year,
        solved_value,
        achieved_fi_year,
        iterations,
        converged,
        feasible,
        message,
    })
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    fi_year: Option<u32>,
    meets_target: bool,
}

fn evaluate_candidate(
    base_params: &SimulationParameters,
    schedule: &AdjustmentSchedule,
    config: GoalSolveConfig,
    candidate_value: f64,
) -> CandidateEval {
    let mut params = base_params.clone();
    params.horizon_override = None;

    match config.goal_type {
        GoalType::RequiredSavings => params.annual_savings = candidate_value,
        GoalType::MaxExpenses => params.annual_expenses = candidate_value.max(0.0),
    }

    let fi_year = project(&params, schedule).fi_year;
    CandidateEval {
        fi_year,
        meets_target: fi_year.is_some_and(|year| year <= config.target_fi_year),
    }
}

fn validate_config(params: &SimulationParameters, config: GoalSolveConfig) -> Result<(), SolveError> {
    params.validate()?;
    if config.target_fi_year > MAX_PROJECTION_YEARS {
        return Err(SolveError::TargetBeyondHorizon(config.target_fi_year));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(SolveError::NonFiniteBounds);
    }
    if config.search_max <= config.search_min {
        return Err(SolveError::EmptySearchRange);
    }
    if config.goal_type == GoalType::MaxExpenses && config.search_min < 0.0 {
        return Err(SolveError::NegativeExpenseBound);
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolveError::NonPositiveTolerance);
    }
    if config.max_iterations == 0 {
        return Err(SolveError::NoIterations);
    }
    Ok(())
}
