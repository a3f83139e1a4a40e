use tracing::debug;

use super::adjustments::AdjustmentSchedule;
use super::types::{
    FiResult, MAX_PROJECTION_YEARS, ParameterError, ProjectionStatus, ScenarioComparison,
    SimulationParameters, SpendingAdjustment, TrajectoryPoint, validate_adjustments,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Window {
    /// Stop at FI, on divergence, or at the ceiling.
    UntilFi,
    /// Always produce every year up to and including this one.
    Through(u32),
}

/// Projects the balance year by year until FI is reached.
///
/// With `horizon_override = Some(n)` the series always covers years `0..=n` (clamped to
/// [`MAX_PROJECTION_YEARS`]) and `fi_year` is the first year inside that window meeting the
/// FI condition. Inputs are assumed to have passed [`SimulationParameters::validate`].
pub fn project(params: &SimulationParameters, schedule: &AdjustmentSchedule) -> FiResult {
    let window = match params.horizon_override {
        Some(years) => Window::Through(years),
        None => Window::UntilFi,
    };
    let result = simulate(params, schedule, window);
    debug!(
        status = ?result.status,
        fi_year = ?result.fi_year,
        points = result.series.len(),
        "projection finished"
    );
    result
}

pub fn try_project(
    params: &SimulationParameters,
    adjustments: &[SpendingAdjustment],
) -> Result<FiResult, ParameterError> {
    params.validate()?;
    validate_adjustments(adjustments)?;
    let schedule = AdjustmentSchedule::from_adjustments(adjustments);
    Ok(project(params, &schedule))
}

/// Runs the plan with and without the schedule so both can be charted on one axis.
pub fn compare_with_baseline(
    params: &SimulationParameters,
    schedule: &AdjustmentSchedule,
) -> ScenarioComparison {
    let baseline_schedule = AdjustmentSchedule::empty();
    let mut baseline = project(params, &baseline_schedule);
    let mut adjusted = project(params, schedule);

    if params.horizon_override.is_none() {
        let span = last_year(&baseline).max(last_year(&adjusted));
        extend_series(&mut baseline, params, &baseline_schedule, span);
        extend_series(&mut adjusted, params, schedule, span);
    }

    let fi_year_delta = match (baseline.fi_year, adjusted.fi_year) {
        (Some(base), Some(with_adjustments)) => Some(i64::from(with_adjustments) - i64::from(base)),
        _ => None,
    };

    ScenarioComparison {
        baseline,
        adjusted,
        fi_year_delta,
        direction: schedule.direction(),
    }
}

/// Amount invested during `year`, before that year's growth lands on the balance.
pub fn net_savings_at(
    params: &SimulationParameters,
    schedule: &AdjustmentSchedule,
    year: u32,
) -> f64 {
    params.annual_savings - schedule.contribution_at(year)
}

/// Spending the withdrawal must cover at `year`: baseline plus recurring extras in force.
pub fn required_spending_at(
    params: &SimulationParameters,
    schedule: &AdjustmentSchedule,
    year: u32,
) -> f64 {
    params.annual_expenses + schedule.recurring_at(year)
}

fn reaches_fi(balance: f64, withdrawal_rate: f64, required_spending: f64) -> bool {
    balance * withdrawal_rate >= required_spending
}

// Only meaningful once the schedule has settled, so `required_spending` and `net_savings`
// stay fixed for every later year.
fn is_stalled(balance: f64, net_savings: f64, return_rate: f64, required_spending: f64) -> bool {
    required_spending > 0.0
        && net_savings <= 0.0
        && return_rate > -1.0
        && (return_rate <= 0.0 || balance <= 0.0)
}

fn simulate(
    params: &SimulationParameters,
    schedule: &AdjustmentSchedule,
    window: Window,
) -> FiResult {
    let (last_year, stop_at_fi) = match window {
        Window::UntilFi => (MAX_PROJECTION_YEARS, true),
        Window::Through(year) => (year.min(MAX_PROJECTION_YEARS), false),
    };
    let growth = 1.0 + params.annual_return_rate;
    let settled_from = schedule.settled_from();

    let mut series = Vec::with_capacity(if stop_at_fi { 64 } else { last_year as usize + 1 });
    let mut balance = params.starting_balance;
    let mut fi_year = None;
    let mut status = ProjectionStatus::HorizonExceeded;

    for year in 0..=last_year {
        series.push(TrajectoryPoint { year, balance });

        let required = required_spending_at(params, schedule, year);
        if fi_year.is_none() && reaches_fi(balance, params.withdrawal_rate, required) {
            fi_year = Some(year);
            status = ProjectionStatus::Reached;
            if stop_at_fi {
                break;
            }
        }
        if year == last_year {
            break;
        }

        let net_savings = net_savings_at(params, schedule, year);
        if fi_year.is_none()
            && status != ProjectionStatus::NonConvergent
            && year >= settled_from
            && is_stalled(balance, net_savings, params.annual_return_rate, required)
        {
            status = ProjectionStatus::NonConvergent;
            if stop_at_fi {
                break;
            }
        }

        balance = balance * growth + net_savings;
    }

    FiResult {
        fi_year,
        fi_target: required_spending_at(params, schedule, 0) / params.withdrawal_rate,
        status,
        series,
    }
}

fn last_year(result: &FiResult) -> u32 {
    result.series.last().map(|point| point.year).unwrap_or(0)
}

fn extend_series(
    result: &mut FiResult,
    params: &SimulationParameters,
    schedule: &AdjustmentSchedule,
    through_year: u32,
) {
    if last_year(result) < through_year {
        result.series = simulate(params, schedule, Window::Through(through_year)).series;
    }
}
