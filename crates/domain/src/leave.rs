//! Time-off records as reported by the HR platform.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use leavesync_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Review status of a time-off request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaveStatus {
    /// Request was approved and the leave is scheduled or ongoing.
    Approved,
    /// Request awaits a decision.
    Pending,
    /// Request was declined.
    Rejected,
    /// Request was withdrawn after submission or approval.
    Cancelled,
    /// Any status the HR platform reports that has no dedicated variant.
    Other(String),
}

impl LeaveStatus {
    /// Parses a status label case-insensitively. Unknown labels are kept verbatim.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "approved" => Self::Approved,
            "pending" | "requested" => Self::Pending,
            "rejected" | "declined" | "denied" => Self::Rejected,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(normalized),
        }
    }

    /// Returns the stable lowercase label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Approved => "approved",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Other(value) => value.as_str(),
        }
    }
}

/// Input payload used to build a [`LeaveRecord`].
#[derive(Debug, Clone)]
pub struct LeaveRecordInput {
    /// HR-side user identifier (the worker email for Deel).
    pub user_identifier: String,
    /// Review status.
    pub status: LeaveStatus,
    /// First day of leave, absent when missing or unparseable upstream.
    pub start_date: Option<NaiveDate>,
    /// Last day of leave, absent for open-ended leave.
    pub end_date: Option<NaiveDate>,
    /// Declared leave amount in days.
    pub amount_days: Option<f64>,
}

/// One immutable time-off entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRecord {
    user_identifier: String,
    status: LeaveStatus,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    amount_days: Option<f64>,
}

impl LeaveRecord {
    /// Creates a leave record.
    ///
    /// Non-finite or negative amounts are dropped.
    pub fn new(input: LeaveRecordInput) -> AppResult<Self> {
        let user_identifier = input.user_identifier.trim().to_owned();
        if user_identifier.is_empty() {
            return Err(AppError::Validation(
                "leave record user identifier must not be empty".to_owned(),
            ));
        }

        let amount_days = input
            .amount_days
            .filter(|amount| amount.is_finite() && *amount >= 0.0);

        Ok(Self {
            user_identifier,
            status: input.status,
            start_date: input.start_date,
            end_date: input.end_date,
            amount_days,
        })
    }

    /// Returns the HR-side user identifier.
    #[must_use]
    pub fn user_identifier(&self) -> &str {
        self.user_identifier.as_str()
    }

    /// Returns the review status.
    #[must_use]
    pub fn status(&self) -> &LeaveStatus {
        &self.status
    }

    /// Returns the first day of leave.
    #[must_use]
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    /// Returns the last day of leave.
    #[must_use]
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Returns the declared amount in days.
    #[must_use]
    pub fn amount_days(&self) -> Option<f64> {
        self.amount_days
    }

    /// Returns whether the leave window covers `date`.
    ///
    /// A record without a start date is never in effect. A missing end date
    /// means the leave is ongoing.
    #[must_use]
    pub fn is_in_effect_on(&self, date: NaiveDate) -> bool {
        let Some(start_date) = self.start_date else {
            return false;
        };

        start_date <= date && self.end_date.is_none_or(|end_date| end_date >= date)
    }

    /// Returns the whole days elapsed between the start date and `date`.
    #[must_use]
    pub fn elapsed_days(&self, date: NaiveDate) -> Option<i64> {
        self.start_date
            .map(|start_date| date.signed_duration_since(start_date).num_days())
    }
}

/// Parses an upstream date value.
///
/// Accepts plain `YYYY-MM-DD` dates, RFC 3339 timestamps (`Z` or explicit
/// offset), and naive `YYYY-MM-DDTHH:MM:SS` timestamps. Timestamps keep the
/// calendar date as written, without converting time zones.
#[must_use]
pub fn parse_leave_date(value: &str) -> Option<NaiveDate> {
    let cleaned = value.trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(date_time) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(date_time.date_naive());
    }

    if let Ok(date_time) = cleaned.parse::<NaiveDateTime>() {
        return Some(date_time.date());
    }

    cleaned.parse::<NaiveDate>().ok()
}
