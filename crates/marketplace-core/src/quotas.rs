//! Tier-based access limits
//!
//! - Template generations: free accounts get one, ever; pro is unlimited
//! - Lead acceptances: 1 per calendar month (UTC) on free, 10 on pro
//! - AI research: free accounts get a small trial; pro is unlimited

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use serde::Serialize;
use shared_types::Tier;
use thiserror::Error;

pub const FREE_TEMPLATE_LIMIT: u32 = 1;
pub const FREE_MONTHLY_LEADS: u32 = 1;
pub const PRO_MONTHLY_LEADS: u32 = 10;
pub const FREE_RESEARCH_QUERIES: u32 = 3;

/// Limits attached to a tier; `None` means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierLimits {
    pub templates: Option<u32>,
    pub monthly_leads: u32,
    pub research_queries: Option<u32>,
}

impl TierLimits {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self {
                templates: Some(FREE_TEMPLATE_LIMIT),
                monthly_leads: FREE_MONTHLY_LEADS,
                research_queries: Some(FREE_RESEARCH_QUERIES),
            },
            Tier::Pro => Self {
                templates: None,
                monthly_leads: PRO_MONTHLY_LEADS,
                research_queries: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("Free plan includes {limit} template; upgrade to generate more")]
    TemplateLimit { limit: u32 },

    #[error("Monthly lead limit reached ({used}/{limit})")]
    LeadLimit { used: u32, limit: u32 },

    #[error("Free research trial exhausted")]
    TrialExhausted,
}

pub fn check_template_quota(tier: Tier, used: u32) -> Result<(), QuotaError> {
    match TierLimits::for_tier(tier).templates {
        Some(limit) if used >= limit => Err(QuotaError::TemplateLimit { limit }),
        _ => Ok(()),
    }
}

pub fn check_lead_quota(tier: Tier, used_this_month: u32) -> Result<(), QuotaError> {
    let limit = TierLimits::for_tier(tier).monthly_leads;
    if used_this_month >= limit {
        Err(QuotaError::LeadLimit {
            used: used_this_month,
            limit,
        })
    } else {
        Ok(())
    }
}

pub fn check_research_trial(tier: Tier, used: u32) -> Result<(), QuotaError> {
    match TierLimits::for_tier(tier).research_queries {
        Some(limit) if used >= limit => Err(QuotaError::TrialExhausted),
        _ => Ok(()),
    }
}

/// Remaining count, `None` when unlimited
pub fn remaining(limit: Option<u32>, used: u32) -> Option<u32> {
    limit.map(|l| l.saturating_sub(used))
}

/// Start (inclusive) and end (exclusive) of the UTC calendar month containing `now`
pub fn month_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let first_day = now
        .date_naive()
        .with_day(1)
        .unwrap_or_else(|| now.date_naive());
    let start = Utc.from_utc_datetime(&first_day.and_time(chrono::NaiveTime::MIN));
    let end = start
        .checked_add_months(Months::new(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_free_template_limit_is_one() {
        assert!(check_template_quota(Tier::Free, 0).is_ok());
        assert_eq!(
            check_template_quota(Tier::Free, 1),
            Err(QuotaError::TemplateLimit { limit: 1 })
        );
        assert!(check_template_quota(Tier::Pro, 500).is_ok());
    }

    #[test]
    fn test_lead_quota_free_vs_pro() {
        assert!(check_lead_quota(Tier::Free, 0).is_ok());
        assert!(check_lead_quota(Tier::Free, 1).is_err());
        assert!(check_lead_quota(Tier::Pro, 9).is_ok());
        assert_eq!(
            check_lead_quota(Tier::Pro, 10),
            Err(QuotaError::LeadLimit {
                used: 10,
                limit: 10
            })
        );
    }

    #[test]
    fn test_research_trial() {
        assert!(check_research_trial(Tier::Free, FREE_RESEARCH_QUERIES - 1).is_ok());
        assert_eq!(
            check_research_trial(Tier::Free, FREE_RESEARCH_QUERIES),
            Err(QuotaError::TrialExhausted)
        );
        assert!(check_research_trial(Tier::Pro, 1_000).is_ok());
    }

    #[test]
    fn test_remaining_saturates() {
        assert_eq!(remaining(Some(1), 3), Some(0));
        assert_eq!(remaining(Some(10), 4), Some(6));
        assert_eq!(remaining(None, 4), None);
    }

    #[test]
    fn test_month_window_mid_month() {
        let now = Utc.with_ymd_and_hms(2025, 2, 14, 18, 30, 0).unwrap();
        let (start, end) = month_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_window_december_rolls_year() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = month_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    proptest! {
        #[test]
        fn prop_month_window_contains_now(secs in 0i64..4_000_000_000i64) {
            let now = Utc.timestamp_opt(secs, 0).unwrap();
            let (start, end) = month_window(now);
            prop_assert!(start <= now && now < end);
            prop_assert_eq!(start.day(), 1);
        }
    }
}
