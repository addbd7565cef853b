//! Small helpers shared by the Scylla store implementations

use chrono::{DateTime, Utc};
use scylla::QueryResult;

/// Whether a lightweight-transaction statement was applied.
///
/// LWT results carry a leading `[applied]` boolean column.
pub(crate) fn lwt_applied(result: &QueryResult) -> bool {
    result
        .rows
        .as_ref()
        .and_then(|rows| rows.first())
        .and_then(|row| row.columns.first())
        .and_then(|col| col.as_ref())
        .and_then(|value| value.as_boolean())
        .unwrap_or(false)
}

pub(crate) fn to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

pub(crate) fn opt_from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}
