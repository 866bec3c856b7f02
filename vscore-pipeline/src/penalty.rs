//! Recency penalty
//!
//! A household that left an assistance program recently already received
//! aid, so its score is reduced. The deduction decays with elapsed months
//! and is zero for old (≥ 24 months) or unknown participation.
//!
//! | elapsed months | penalty |
//! |----------------|---------|
//! | < 6            | 40      |
//! | 6 ..< 12       | 20      |
//! | 12 ..< 24      | 10      |
//! | 24 ..< 120     | 0       |
//! | ≥ 120 / unknown| 0       |

use crate::period::YearMonth;
use serde::{Deserialize, Serialize};

/// Elapsed-months value for an unknown period
pub const UNKNOWN_ELAPSED_MONTHS: u32 = 9999;

/// Largest possible per-program penalty
pub const MAX_PROGRAM_PENALTY: i64 = 40;

/// Months elapsed from `period` to `now`
///
/// Unknown periods give [`UNKNOWN_ELAPSED_MONTHS`]; future periods clamp to 0.
pub fn months_since(period: YearMonth, now: YearMonth) -> u32 {
    if period.is_unknown() {
        return UNKNOWN_ELAPSED_MONTHS;
    }

    let delta = (i64::from(now.year) - i64::from(period.year)) * 12
        + (i64::from(now.month) - i64::from(period.month));

    delta.clamp(0, i64::from(u32::MAX)) as u32
}

/// Step function from elapsed months to a penalty
pub fn penalty_from_months(months: u32) -> i64 {
    if months >= 120 {
        return 0;
    }
    match months {
        0..=5 => 40,
        6..=11 => 20,
        12..=23 => 10,
        _ => 0,
    }
}

/// Per-program penalties for one household
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecencyPenalty {
    pub bpnt: i64,
    pub pkh: i64,
}

impl RecencyPenalty {
    /// Compute both program penalties independently
    pub fn compute(bpnt_period: YearMonth, pkh_period: YearMonth, now: YearMonth) -> Self {
        Self {
            bpnt: penalty_from_months(months_since(bpnt_period, now)),
            pkh: penalty_from_months(months_since(pkh_period, now)),
        }
    }

    /// Sum of both programs, always within 0..=80
    pub fn total(&self) -> i64 {
        self.bpnt + self.pkh
    }
}
