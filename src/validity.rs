//! Validity windows for test evidence.
//!
//! A test stamps its holon with an expiry date. Internal evidence lasts 90
//! days, external evidence 60. Anything unrecognized gets the 90-day default.
//! The gating engine does not enforce these dates; decay tooling reads them.

use chrono::{Days, Local, NaiveDate};

/// Where test evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestType {
    Internal,
    External,
    /// Absent or unrecognized.
    Other,
}

impl TestType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "internal" => Self::Internal,
            "external" => Self::External,
            _ => Self::Other,
        }
    }

    /// Days the evidence stays valid.
    pub fn retention_days(self) -> u64 {
        match self {
            Self::External => 60,
            Self::Internal | Self::Other => 90,
        }
    }
}

/// `YYYY-MM-DD` expiry for evidence of `test_type` gathered on `date`.
pub fn valid_until_from(date: NaiveDate, test_type: &str) -> String {
    let days = TestType::parse(test_type).retention_days();
    date.checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
        .format("%Y-%m-%d")
        .to_string()
}

/// `YYYY-MM-DD` expiry for evidence of `test_type` gathered today.
pub fn compute_valid_until(test_type: &str) -> String {
    valid_until_from(Local::now().date_naive(), test_type)
}
