use crate::models::Message;
use chrono::DateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub data: Vec<usize>,
}

/// Chart data for a filtered selection, computed over the rows `query`
/// returned.
#[derive(Debug, Clone, Serialize)]
pub struct MailboxReport {
    /// Running total of messages per UTC day, oldest day first.
    pub emails_received: Series,
    /// Messages per sender, busiest first.
    pub emails_per_sender: Series,
    pub emails: Vec<Message>,
}

impl MailboxReport {
    pub fn build(emails: Vec<Message>) -> Self {
        Self {
            emails_received: cumulative_daily(&emails),
            emails_per_sender: per_sender(&emails),
            emails,
        }
    }
}

fn cumulative_daily(emails: &[Message]) -> Series {
    let mut per_day = BTreeMap::new();
    for msg in emails {
        let day = DateTime::from_timestamp_millis(msg.received_on)
            .map(|ts| ts.date_naive().to_string())
            .unwrap_or_default();
        *per_day.entry(day).or_insert(0usize) += 1;
    }

    let mut series = Series::default();
    let mut total = 0;
    for (day, count) in per_day {
        total += count;
        series.labels.push(day);
        series.data.push(total);
    }
    series
}

fn per_sender(emails: &[Message]) -> Series {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for msg in emails {
        *counts.entry(msg.sender_email.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut series = Series::default();
    for (sender, count) in ranked {
        series.labels.push(sender.to_string());
        series.data.push(count);
    }
    series
}
