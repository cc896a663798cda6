//! Cognitive load — the daily revision budget.
//!
//! One row per UTC day, created lazily on first use. Revisions debit the
//! budget; fatigue is derived from the remaining ratio; recovery happens
//! via an explicit daily rollover, not a background timer.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default daily revision budget.
pub const DEFAULT_BUDGET_MAX: u32 = 100;

/// Default budget points restored per daily rollover.
pub const DEFAULT_RECOVERY_RATE: u32 = 10;

/// Fatigue derived from the remaining-budget ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatigueLevel {
    /// Remaining >= 70% of max.
    Rested,
    /// Remaining >= 40%.
    Engaged,
    /// Remaining > 10%.
    Strained,
    /// Remaining <= 10%; the revision gate closes.
    Overwhelmed,
}

impl fmt::Display for FatigueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rested => write!(f, "rested"),
            Self::Engaged => write!(f, "engaged"),
            Self::Strained => write!(f, "strained"),
            Self::Overwhelmed => write!(f, "overwhelmed"),
        }
    }
}

/// Budget cost of a revision with the given conviction delta.
///
/// Deltas above the rate limit should never reach the scheduler, but they
/// are costed anyway.
#[must_use]
pub fn cost_for_delta(delta: i16) -> u32 {
    let magnitude = delta.abs();
    if magnitude > 30 {
        20
    } else if magnitude > 15 {
        10
    } else {
        5
    }
}

/// One calendar day's revision capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveLoad {
    /// UTC day this row covers.
    pub day: NaiveDate,

    pub revision_budget_max: u32,
    pub revision_budget_remaining: u32,
    pub budget_used_today: u32,

    /// Count of revisions applied today.
    pub revisions_today: u32,

    /// Days in a row that ended overwhelmed, up to and including yesterday.
    pub consecutive_overwhelmed_days: u32,
}

impl CognitiveLoad {
    /// A fresh day at full capacity.
    #[must_use]
    pub fn fresh(day: NaiveDate, budget_max: u32) -> Self {
        Self {
            day,
            revision_budget_max: budget_max,
            revision_budget_remaining: budget_max,
            budget_used_today: 0,
            revisions_today: 0,
            consecutive_overwhelmed_days: 0,
        }
    }

    /// The next day's row, rolled over from this one.
    ///
    /// Remaining budget recovers by `recovery_rate`, capped at max; the
    /// overwhelmed streak grows if this day ended overwhelmed.
    #[must_use]
    pub fn rolled_over(&self, recovery_rate: u32) -> Self {
        let next_day = self.day.succ_opt().unwrap_or(self.day);
        let remaining =
            (self.revision_budget_remaining + recovery_rate).min(self.revision_budget_max);
        let streak = if self.fatigue_level() == FatigueLevel::Overwhelmed {
            self.consecutive_overwhelmed_days + 1
        } else {
            0
        };

        Self {
            day: next_day,
            revision_budget_max: self.revision_budget_max,
            revision_budget_remaining: remaining,
            budget_used_today: 0,
            revisions_today: 0,
            consecutive_overwhelmed_days: streak,
        }
    }

    /// Fatigue derived from the remaining-budget ratio.
    #[must_use]
    pub fn fatigue_level(&self) -> FatigueLevel {
        if self.revision_budget_max == 0 {
            return FatigueLevel::Overwhelmed;
        }
        let ratio =
            f64::from(self.revision_budget_remaining) / f64::from(self.revision_budget_max);
        if ratio >= 0.7 {
            FatigueLevel::Rested
        } else if ratio >= 0.4 {
            FatigueLevel::Engaged
        } else if ratio > 0.1 {
            FatigueLevel::Strained
        } else {
            FatigueLevel::Overwhelmed
        }
    }

    /// Gate: may existing beliefs be revised right now?
    #[must_use]
    pub fn can_revise_existing_beliefs(&self) -> bool {
        self.revision_budget_remaining > 0
            && self.fatigue_level() != FatigueLevel::Overwhelmed
    }

    /// Gate: may new beliefs still be formed?
    ///
    /// Formation is cheaper than revision and stays open until the budget
    /// is fully spent.
    #[must_use]
    pub const fn can_form_new_beliefs(&self) -> bool {
        self.revision_budget_remaining > 0
    }

    /// Debits the cost of a revision, flooring at zero.
    pub fn debit(&mut self, cost: u32) {
        let spent = cost.min(self.revision_budget_remaining);
        self.revision_budget_remaining -= spent;
        self.budget_used_today += cost;
        self.revisions_today += 1;
    }
}

/// The UTC day an instant falls on.
#[must_use]
pub fn day_of(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}
