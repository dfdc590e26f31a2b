//! Named reporting periods and their concrete time windows.
//!
//! A period token resolves to a half-open `[start, end)` window, or to an
//! unbounded window for `ALL_TIME`. Resolution is pure and deterministic
//! given `now`; callers that need reproducibility inject the clock through
//! [`TimeRange::resolve_at`].

use crate::errors::ServiceError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Recognized reporting period tokens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Period {
    #[strum(serialize = "TODAY")]
    #[serde(rename = "TODAY")]
    Today,
    #[strum(serialize = "YESTERDAY")]
    #[serde(rename = "YESTERDAY")]
    Yesterday,
    #[strum(serialize = "LAST_7_DAYS")]
    #[serde(rename = "LAST_7_DAYS")]
    Last7Days,
    #[strum(serialize = "LAST_30_DAYS")]
    #[serde(rename = "LAST_30_DAYS")]
    Last30Days,
    #[strum(serialize = "LAST_90_DAYS")]
    #[serde(rename = "LAST_90_DAYS")]
    Last90Days,
    #[strum(serialize = "LAST_365_DAYS")]
    #[serde(rename = "LAST_365_DAYS")]
    Last365Days,
    #[strum(serialize = "ALL_TIME")]
    #[serde(rename = "ALL_TIME")]
    AllTime,
}

impl Period {
    /// Parses a period token, mapping unknown tokens to `InvalidPeriod`.
    pub fn parse(token: &str) -> Result<Self, ServiceError> {
        token
            .parse()
            .map_err(|_| ServiceError::InvalidPeriod(token.to_string()))
    }
}

/// A concrete time window. `None` bounds mean "no constraint", never a
/// zero-width window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Resolves `period` against the current clock.
    pub fn resolve(period: Period) -> Self {
        Self::resolve_at(period, Utc::now())
    }

    /// Resolves `period` relative to an injected `now`. Windows are
    /// half-open: `created_at >= start && created_at < end`.
    pub fn resolve_at(period: Period, now: DateTime<Utc>) -> Self {
        let today = day_start(now);
        let tomorrow = today + Duration::days(1);

        match period {
            Period::Today => Self {
                start: Some(today),
                end: Some(tomorrow),
            },
            Period::Yesterday => Self {
                start: Some(today - Duration::days(1)),
                end: Some(today),
            },
            Period::Last7Days => Self {
                start: Some(today - Duration::days(7)),
                end: Some(tomorrow),
            },
            Period::Last30Days => Self {
                start: Some(today - Duration::days(30)),
                end: Some(tomorrow),
            },
            Period::Last90Days => Self {
                start: Some(today - Duration::days(90)),
                end: Some(tomorrow),
            },
            Period::Last365Days => Self {
                start: Some(today - Duration::days(365)),
                end: Some(tomorrow),
            },
            Period::AllTime => Self {
                start: None,
                end: None,
            },
        }
    }

    /// True when `instant` falls inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if instant < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if instant >= end {
                return false;
            }
        }
        true
    }
}

fn day_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 45).unwrap()
    }

    #[test]
    fn today_is_half_open_day_window() {
        let range = TimeRange::resolve_at(Period::Today, noon());
        assert_eq!(
            range.start,
            Some(Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(
            range.end,
            Some(Utc.with_ymd_and_hms(2024, 6, 16, 0, 0, 0).unwrap())
        );

        assert!(range.contains(noon()));
        assert!(range.contains(range.start.unwrap()));
        // end bound is exclusive
        assert!(!range.contains(range.end.unwrap()));
    }

    #[test]
    fn yesterday_is_previous_day() {
        let range = TimeRange::resolve_at(Period::Yesterday, noon());
        assert_eq!(
            range.start,
            Some(Utc.with_ymd_and_hms(2024, 6, 14, 0, 0, 0).unwrap())
        );
        assert_eq!(
            range.end,
            Some(Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap())
        );
        assert!(!range.contains(noon()));
    }

    #[test]
    fn last_n_days_reaches_back_n_day_starts() {
        let range = TimeRange::resolve_at(Period::Last7Days, noon());
        assert_eq!(
            range.start,
            Some(Utc.with_ymd_and_hms(2024, 6, 8, 0, 0, 0).unwrap())
        );
        // ...and still includes the rest of today
        assert_eq!(
            range.end,
            Some(Utc.with_ymd_and_hms(2024, 6, 16, 0, 0, 0).unwrap())
        );

        let range = TimeRange::resolve_at(Period::Last365Days, noon());
        assert_eq!(
            range.start,
            Some(Utc.with_ymd_and_hms(2023, 6, 16, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn all_time_is_unbounded() {
        let range = TimeRange::resolve_at(Period::AllTime, noon());
        assert_eq!(range.start, None);
        assert_eq!(range.end, None);
        assert!(range.contains(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()));
        assert!(range.contains(noon()));
    }

    #[test]
    fn resolution_is_deterministic_given_now() {
        let a = TimeRange::resolve_at(Period::Last30Days, noon());
        let b = TimeRange::resolve_at(Period::Last30Days, noon());
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_token_is_invalid_period() {
        let err = Period::parse("LAST_WEEKEND").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPeriod(ref t) if t == "LAST_WEEKEND"));
    }

    #[test]
    fn tokens_round_trip() {
        for (token, period) in [
            ("TODAY", Period::Today),
            ("YESTERDAY", Period::Yesterday),
            ("LAST_7_DAYS", Period::Last7Days),
            ("LAST_30_DAYS", Period::Last30Days),
            ("LAST_90_DAYS", Period::Last90Days),
            ("LAST_365_DAYS", Period::Last365Days),
            ("ALL_TIME", Period::AllTime),
        ] {
            assert_eq!(Period::parse(token).unwrap(), period);
            assert_eq!(period.to_string(), token);
        }
    }
}
