//! Global send quota
//!
//! The provider plan allows a fixed number of messages per UTC day and per
//! UTC month. Counters roll over lazily on the first send of a new period.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default provider allowance per UTC day
pub const DEFAULT_DAILY_LIMIT: u32 = 100;

/// Default provider allowance per UTC month
pub const DEFAULT_MONTHLY_LIMIT: u32 = 3000;

/// Fraction of a limit at which a single warning is logged
const WARNING_PERCENT: u32 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaCheck {
    /// Send may proceed; flags are set the first time a period crosses the warning line
    Allowed {
        daily_warning: bool,
        monthly_warning: bool,
    },
    DailyExceeded { limit: u32, remaining_month: u32 },
    MonthlyExceeded { limit: u32 },
}

impl QuotaCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaCheck::Allowed { .. })
    }
}

/// Counters for the current day and month
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendQuota {
    daily_limit: u32,
    monthly_limit: u32,
    daily_count: u32,
    /// YYYY-MM-DD
    day: String,
    monthly_count: u32,
    /// YYYY-MM
    month: String,
    daily_warned: bool,
    monthly_warned: bool,
}

fn threshold(limit: u32) -> u32 {
    (u64::from(limit) * u64::from(WARNING_PERCENT)).div_ceil(100) as u32
}

impl SendQuota {
    pub fn new(daily_limit: u32, monthly_limit: u32) -> Self {
        Self {
            daily_limit,
            monthly_limit,
            ..Default::default()
        }
    }

    /// Zero the counters whose period differs from `now`
    fn roll_over(&mut self, now: DateTime<Utc>) {
        let today = now.format("%Y-%m-%d").to_string();
        let this_month = now.format("%Y-%m").to_string();

        if self.day != today {
            self.daily_count = 0;
            self.day = today;
            self.daily_warned = false;
        }
        if self.month != this_month {
            self.monthly_count = 0;
            self.month = this_month;
            self.monthly_warned = false;
        }
    }

    /// Reserve one send at `now`, counting it only when allowed
    pub fn try_reserve(&mut self, now: DateTime<Utc>) -> QuotaCheck {
        self.roll_over(now);

        if self.daily_count >= self.daily_limit {
            return QuotaCheck::DailyExceeded {
                limit: self.daily_limit,
                remaining_month: self.monthly_limit.saturating_sub(self.monthly_count),
            };
        }
        if self.monthly_count >= self.monthly_limit {
            return QuotaCheck::MonthlyExceeded {
                limit: self.monthly_limit,
            };
        }

        self.daily_count += 1;
        self.monthly_count += 1;

        let daily_warning = !self.daily_warned && self.daily_count >= threshold(self.daily_limit);
        self.daily_warned |= daily_warning;
        let monthly_warning =
            !self.monthly_warned && self.monthly_count >= threshold(self.monthly_limit);
        self.monthly_warned |= monthly_warning;

        QuotaCheck::Allowed {
            daily_warning,
            monthly_warning,
        }
    }

    /// Give back a reservation whose send failed at the provider
    pub fn release(&mut self) {
        self.daily_count = self.daily_count.saturating_sub(1);
        self.monthly_count = self.monthly_count.saturating_sub(1);
    }

    /// Remaining (daily, monthly) allowance at `now`
    pub fn remaining(&mut self, now: DateTime<Utc>) -> (u32, u32) {
        self.roll_over(now);
        (
            self.daily_limit.saturating_sub(self.daily_count),
            self.monthly_limit.saturating_sub(self.monthly_count),
        )
    }
}
