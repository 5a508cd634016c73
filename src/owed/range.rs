use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do with records when the requested date range cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidRangePolicy {
    /// Keep every record that has a resolvable timestamp
    #[default]
    AcceptAll,
    /// Keep nothing
    RejectAll,
}

impl fmt::Display for InvalidRangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidRangePolicy::AcceptAll => write!(f, "accept-all"),
            InvalidRangePolicy::RejectAll => write!(f, "reject-all"),
        }
    }
}

impl FromStr for InvalidRangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "accept-all" => Ok(InvalidRangePolicy::AcceptAll),
            "reject-all" => Ok(InvalidRangePolicy::RejectAll),
            other => Err(format!(
                "invalid policy '{other}'. Use 'accept-all' or 'reject-all'."
            )),
        }
    }
}

/// Inclusive range of UTC calendar days, stored as `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end_exclusive: DateTime<Utc>,
}

impl DateRange {
    pub fn from_days(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        let start = from.and_hms_opt(0, 0, 0)?.and_utc();
        let end_exclusive = to.checked_add_days(Days::new(1))?.and_hms_opt(0, 0, 0)?.and_utc();
        Some(Self {
            start,
            end_exclusive,
        })
    }

    /// Parse two `YYYY-MM-DD` bounds; `None` if either is malformed.
    pub fn parse(from_ymd: &str, to_ymd: &str) -> Option<Self> {
        let from = NaiveDate::parse_from_str(from_ymd.trim(), "%Y-%m-%d").ok()?;
        let to = NaiveDate::parse_from_str(to_ymd.trim(), "%Y-%m-%d").ok()?;
        Self::from_days(from, to)
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start <= *at && *at < self.end_exclusive
    }
}

/// The effective timestamp filter for one aggregation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFilter {
    Within(DateRange),
    AcceptAll,
    RejectAll,
}

impl RangeFilter {
    pub fn new(from_ymd: &str, to_ymd: &str, policy: InvalidRangePolicy) -> Self {
        match DateRange::parse(from_ymd, to_ymd) {
            Some(range) => RangeFilter::Within(range),
            None => match policy {
                InvalidRangePolicy::AcceptAll => RangeFilter::AcceptAll,
                InvalidRangePolicy::RejectAll => RangeFilter::RejectAll,
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, RangeFilter::Within(_))
    }

    pub fn admits(&self, at: &DateTime<Utc>) -> bool {
        match self {
            RangeFilter::Within(range) => range.contains(at),
            RangeFilter::AcceptAll => true,
            RangeFilter::RejectAll => false,
        }
    }
}
