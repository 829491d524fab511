use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

/// Sender value that matches every sender.
pub const ALL_SENDERS: &str = "all";

/// User-chosen predicates narrowing a message selection. All active
/// predicates are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Inclusive lower bound on `received_on`, ms since epoch.
    pub start: Option<i64>,
    /// Inclusive upper bound on `received_on`, ms since epoch.
    pub end: Option<i64>,
    pub sender_email: Option<String>,
    pub exclude_starred: bool,
    pub exclude_important: bool,
    pub exclude_personal: bool,
    pub exclude_read: bool,
    pub exclude_sent: bool,
}

impl FilterSpec {
    /// The sender to match on, or `None` when the filter is a wildcard.
    pub fn sender(&self) -> Option<&str> {
        self.sender_email
            .as_deref()
            .filter(|s| !s.is_empty() && *s != ALL_SENDERS)
    }

    /// Appends the WHERE clause for this filter. Every read and every
    /// filter-driven mutation selects rows through this one function.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1=1");
        if let Some(start) = self.start {
            qb.push(" AND received_on >= ").push_bind(start);
        }
        if let Some(end) = self.end {
            qb.push(" AND received_on <= ").push_bind(end);
        }
        if let Some(sender) = self.sender() {
            qb.push(" AND sender_email = ").push_bind(sender.to_string());
        }
        for (active, column) in [
            (self.exclude_starred, "is_starred"),
            (self.exclude_important, "is_important"),
            (self.exclude_personal, "is_personal"),
            (self.exclude_read, "is_read"),
            (self.exclude_sent, "is_replied"),
        ] {
            if active {
                qb.push(" AND ").push(column).push(" = 0");
            }
        }
    }
}

/// Which end of a day a bare date should resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Parses `YYYY-MM-DD` (UTC) or an RFC 3339 timestamp into ms since epoch.
/// A bare date used as an end bound covers the whole day.
pub fn parse_bound(value: &str, bound: Bound) -> Result<i64> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let time = match bound {
            Bound::Start => NaiveTime::MIN,
            Bound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
                .context("building end-of-day time")?,
        };
        return Ok(date.and_time(time).and_utc().timestamp_millis());
    }
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Ok(ts.timestamp_millis()),
        Err(_) => bail!("'{value}' is neither YYYY-MM-DD nor an RFC 3339 timestamp"),
    }
}
