// Copyright 2025 Fleetlens Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! One row of a tabular telemetry export.
//!
//! Records arrive from the row source as string key/value pairs; numeric
//! coercion and timestamp parsing happen here, lazily, when the engine
//! asks for a typed view of a field.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;

/// A single row of a telemetry export, owned for the duration of one pass.
#[derive(Debug, Clone, Default)]
pub struct MetricRecord {
    fields: HashMap<String, String>,
}

impl MetricRecord {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    /// Raw string value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Parsed timestamp of a field, or `None` when the field is absent,
    /// empty, or unparsable. A record without a usable date is skipped by
    /// the engine rather than failing the pass.
    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(parse_timestamp)
    }

    /// Numeric value of a metric field. Absent or garbled values coerce to
    /// zero so one bad cell never aborts an aggregation pass.
    pub fn metric(&self, field: &str) -> f64 {
        coerce_numeric(self.get(field))
    }

    /// Field names in this record, in no particular order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<HashMap<String, String>> for MetricRecord {
    fn from(fields: HashMap<String, String>) -> Self {
        Self::new(fields)
    }
}

/// Parse a timestamp as it appears in the exports.
///
/// The pipelines are not consistent: some write RFC 3339, some a naive
/// `YYYY-MM-DD HH:MM:SS`, some a bare calendar date. Everything is
/// interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Coerce an optional raw cell to a number, defaulting to zero.
pub fn coerce_numeric(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(pairs: &[(&str, &str)]) -> MetricRecord {
        MetricRecord::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn parses_bare_date_as_utc_midnight() {
        let ts = parse_timestamp("2024-01-01").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_naive_datetime() {
        let ts = parse_timestamp("2024-03-05 13:45:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 5, 13, 45, 0).unwrap());
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let ts = parse_timestamp("2024-03-05T10:00:00-05:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 5, 15, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-40").is_none());
    }

    #[test]
    fn metric_coerces_missing_and_garbled_to_zero() {
        let rec = record(&[("count", "42"), ("ratio", "0.5"), ("bad", "n/a")]);
        assert_eq!(rec.metric("count"), 42.0);
        assert_eq!(rec.metric("ratio"), 0.5);
        assert_eq!(rec.metric("bad"), 0.0);
        assert_eq!(rec.metric("absent"), 0.0);
    }

    #[test]
    fn timestamp_of_missing_field_is_none() {
        let rec = record(&[("date", "not a date")]);
        assert!(rec.timestamp("date").is_none());
        assert!(rec.timestamp("other").is_none());
    }
}
