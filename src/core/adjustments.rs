use super::types::{
    Category, FlowDirection, PRE_RETIREMENT_YEARS, SpendingAdjustment, TimeUnit,
};
use super::units::to_annual;

#[derive(Debug, Clone, Copy, PartialEq)]
struct RecurringFlow {
    annual: f64,
    duration_years: Option<u32>,
    pre_retirement_only: bool,
}

impl RecurringFlow {
    fn applies_at(self, year: u32) -> bool {
        let within_duration = match self.duration_years {
            None => true,
            Some(0) => false,
            Some(years) => year <= years,
        };
        within_duration && (!self.pre_retirement_only || year < PRE_RETIREMENT_YEARS)
    }

    /// First year from which the flow is off for good, or 0 when it never switches.
    fn switches_off_at(self) -> u32 {
        let duration_end = self.duration_years.map(|years| years.saturating_add(1));
        let retirement_end = self.pre_retirement_only.then_some(PRE_RETIREMENT_YEARS);
        match (duration_end, retirement_end) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => 0,
        }
    }
}

/// Year-indexed view of an adjustment list.
///
/// Built from a borrowed snapshot of the list; the list itself is never touched again, so
/// every projection sees exactly the entries that existed when the schedule was built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjustmentSchedule {
    recurring: Vec<RecurringFlow>,
    one_time_total: f64,
}

impl AdjustmentSchedule {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_adjustments<'a, I>(adjustments: I) -> Self
    where
        I: IntoIterator<Item = &'a SpendingAdjustment>,
    {
        let mut recurring = Vec::new();
        let mut one_time_total = 0.0;

        for adj in adjustments.into_iter().filter(|adj| !adj.disabled) {
            match adj.time_unit {
                TimeUnit::Once => one_time_total += adj.value,
                unit => recurring.push(RecurringFlow {
                    annual: to_annual(adj.value, unit),
                    duration_years: adj.duration_years,
                    pre_retirement_only: adj.pre_retirement_only,
                }),
            }
        }

        Self {
            recurring,
            one_time_total,
        }
    }

    /// Annualized recurring extra expense in force at `year`.
    pub fn recurring_at(&self, year: u32) -> f64 {
        self.recurring
            .iter()
            .filter(|flow| flow.applies_at(year))
            .map(|flow| flow.annual)
            .sum()
    }

    pub fn one_time_total(&self) -> f64 {
        self.one_time_total
    }

    /// Everything subtracted from the baseline savings during `year`.
    pub fn contribution_at(&self, year: u32) -> f64 {
        let once = if year == 0 { self.one_time_total } else { 0.0 };
        self.recurring_at(year) + once
    }

    pub fn direction(&self) -> FlowDirection {
        let total = self.recurring_at(0);
        if total > 0.0 {
            FlowDirection::ExtraExpense
        } else if total < 0.0 {
            FlowDirection::ExtraSaving
        } else {
            FlowDirection::Neutral
        }
    }

    /// First year from which `contribution_at` no longer changes.
    pub fn settled_from(&self) -> u32 {
        self.recurring
            .iter()
            .map(|flow| flow.switches_off_at())
            .max()
            .unwrap_or(0)
            .max(1)
    }
}

/// Which tagged adjustments take part in a projection.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CategoryVisibility {
    pub show_car: bool,
    pub show_bike: bool,
}

impl CategoryVisibility {
    pub fn all() -> Self {
        Self {
            show_car: true,
            show_bike: true,
        }
    }

    pub fn admits(&self, adjustment: &SpendingAdjustment) -> bool {
        match adjustment.category {
            None => true,
            Some(Category::Car) => self.show_car,
            Some(Category::Bike) => self.show_bike,
        }
    }

    pub fn visible<'a>(
        self,
        adjustments: &'a [SpendingAdjustment],
    ) -> impl Iterator<Item = &'a SpendingAdjustment> + 'a {
        adjustments.iter().filter(move |adj| self.admits(adj))
    }
}
