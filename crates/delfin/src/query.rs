//! In-process filtering and statistics over the stored order set.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::order::{OrderRecord, DATE_FORMAT, STATUS_PENDING};

/// Status restriction for [`search`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    /// Exact match on the stored status value.
    Only(String),
}

impl StatusFilter {
    /// Parses a filter value: `all` (or empty) passes everything.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "all" => StatusFilter::All,
            status => StatusFilter::Only(status.to_string()),
        }
    }

    fn matches(&self, record: &OrderRecord) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => record.order.status == *status,
        }
    }
}

/// Summary counters shown above the order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total: usize,
    pub today_count: usize,
    pub pending_count: usize,
}

/// Filters `records` by a free-text query and a status filter, newest first.
///
/// A non-empty query matches case-insensitively as a substring of the order
/// number, client name, client number, reference number or denomination.
pub fn search(records: &[OrderRecord], query: &str, status: &StatusFilter) -> Vec<OrderRecord> {
    let needle = query.trim().to_lowercase();

    let mut matches: Vec<OrderRecord> = records
        .iter()
        .filter(|r| needle.is_empty() || matches_query(r, &needle))
        .filter(|r| status.matches(r))
        .cloned()
        .collect();

    sort_newest_first(&mut matches);
    matches
}

fn matches_query(record: &OrderRecord, needle: &str) -> bool {
    let order = &record.order;
    [
        &order.order_number,
        &order.client_name,
        &order.client_number,
        &order.reference_number,
        &order.denomination,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Sorts by timestamp descending; ties fall back to the higher id.
pub fn sort_newest_first(records: &mut [OrderRecord]) {
    records.sort_by(|a, b| match b.timestamp.cmp(&a.timestamp) {
        Ordering::Equal => b.id.cmp(&a.id),
        other => other,
    });
}

/// Counts all records, those dated `today`, and those pending.
pub fn stats(records: &[OrderRecord], today: NaiveDate) -> OrderStats {
    let today = today.format(DATE_FORMAT).to_string();
    OrderStats {
        total: records.len(),
        today_count: records.iter().filter(|r| r.order.date == today).count(),
        pending_count: records
            .iter()
            .filter(|r| r.order.status == STATUS_PENDING)
            .count(),
    }
}
