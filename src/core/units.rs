use super::types::TimeUnit;

const MONTHS_PER_YEAR: f64 = 12.0;

/// Annual equivalent of `value`. `Once` is returned unchanged; applying it a single time
/// is the caller's job.
pub fn to_annual(value: f64, unit: TimeUnit) -> f64 {
    match unit {
        TimeUnit::Monthly => value * MONTHS_PER_YEAR,
        TimeUnit::Annual | TimeUnit::Once => value,
    }
}

pub fn from_annual(annual: f64, unit: TimeUnit) -> f64 {
    match unit {
        TimeUnit::Monthly => annual / MONTHS_PER_YEAR,
        TimeUnit::Annual | TimeUnit::Once => annual,
    }
}
