use serde::Serialize;
use thiserror::Error;

/// Years during which a `pre_retirement_only` adjustment stays in force.
///
/// The projection does not know the FI year while it is still running, so "before
/// retirement" is approximated by this fixed window.
pub const PRE_RETIREMENT_YEARS: u32 = 50;

/// Hard ceiling on the number of simulated years after year 0.
pub const MAX_PROJECTION_YEARS: u32 = 300;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Annual,
    Monthly,
    Once,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Car,
    Bike,
}

/// One entry of the user's extra cash-flow list.
///
/// `value` is signed: a positive value is an added expense and lowers net savings, a
/// negative value is extra saving and raises them. Every consumer in this crate reads the
/// sign this way.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendingAdjustment {
    pub value: f64,
    pub time_unit: TimeUnit,
    /// Applies while `year <= duration_years`; `Some(0)` never applies.
    pub duration_years: Option<u32>,
    pub pre_retirement_only: bool,
    pub disabled: bool,
    pub category: Option<Category>,
}

impl SpendingAdjustment {
    pub fn new(value: f64, time_unit: TimeUnit) -> Self {
        Self {
            value,
            time_unit,
            duration_years: None,
            pre_retirement_only: false,
            disabled: false,
            category: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    pub starting_balance: f64,
    pub annual_savings: f64,
    pub annual_expenses: f64,
    pub annual_return_rate: f64,
    pub withdrawal_rate: f64,
    pub horizon_override: Option<u32>,
}

impl SimulationParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (field, value) in [
            ("starting_balance", self.starting_balance),
            ("annual_savings", self.annual_savings),
            ("annual_expenses", self.annual_expenses),
            ("annual_return_rate", self.annual_return_rate),
            ("withdrawal_rate", self.withdrawal_rate),
        ] {
            if !value.is_finite() {
                return Err(ParameterError::NonFinite { field });
            }
        }

        if self.starting_balance < 0.0 {
            return Err(ParameterError::Negative {
                field: "starting_balance",
                value: self.starting_balance,
            });
        }
        if self.annual_expenses < 0.0 {
            return Err(ParameterError::Negative {
                field: "annual_expenses",
                value: self.annual_expenses,
            });
        }
        if self.withdrawal_rate <= 0.0 {
            return Err(ParameterError::NonPositiveWithdrawalRate(
                self.withdrawal_rate,
            ));
        }
        if self.annual_return_rate <= -1.0 {
            return Err(ParameterError::ReturnRateTooLow(self.annual_return_rate));
        }
        if self.horizon_override == Some(0) {
            return Err(ParameterError::EmptyHorizon);
        }
        Ok(())
    }
}

pub fn validate_adjustments(adjustments: &[SpendingAdjustment]) -> Result<(), ParameterError> {
    match adjustments.iter().position(|adj| !adj.value.is_finite()) {
        Some(index) => Err(ParameterError::NonFiniteAdjustment { index }),
        None => Ok(()),
    }
}

/// Rejected input, detected before any projection runs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParameterError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("withdrawal rate must be > 0, got {0}")]
    NonPositiveWithdrawalRate(f64),
    #[error("return rate must be > -100%, got {0}")]
    ReturnRateTooLow(f64),
    #[error("horizon override must be at least one year")]
    EmptyHorizon,
    #[error("adjustment {index} must have a finite value")]
    NonFiniteAdjustment { index: usize },
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub year: u32,
    pub balance: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectionStatus {
    Reached,
    /// FI is provably out of reach: growth can no longer lift the balance.
    NonConvergent,
    /// The projection window ended before FI was reached.
    HorizonExceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiResult {
    pub fi_year: Option<u32>,
    /// Balance needed at year 0, recurring extras included.
    pub fi_target: f64,
    pub status: ProjectionStatus,
    pub series: Vec<TrajectoryPoint>,
}

/// Net effect of the recurring adjustments at year 0.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowDirection {
    ExtraExpense,
    ExtraSaving,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioComparison {
    pub baseline: FiResult,
    pub adjusted: FiResult,
    /// `adjusted - baseline` in years, when both reach FI.
    pub fi_year_delta: Option<i64>,
    pub direction: FlowDirection,
}
