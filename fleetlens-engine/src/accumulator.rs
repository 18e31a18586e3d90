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

//! Per-group running aggregate state.
//!
//! A group accumulates distinct driver/trip identifier sets, exact sums
//! per metric field, and the min/max of the date column over exactly the
//! records the filter admitted. Nothing is finalized until the pass ends:
//! distinct cardinality and date range are only meaningful over the whole
//! filtered set.

use chrono::{DateTime, SecondsFormat, Utc};
use fleetlens_core::{EndpointSpec, MetricRecord};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Finalized aggregate of one group, flattened for serialization:
/// `{driver_count, trip_count, record_count, min_date, max_date,
/// <metric fields...>}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupSummary {
    pub driver_count: u64,
    pub trip_count: u64,
    pub record_count: u64,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
    #[serde(flatten)]
    pub metrics: BTreeMap<String, f64>,
}

/// Running state of one group during a pass.
#[derive(Debug, Default)]
pub struct GroupAccumulator {
    drivers: HashSet<String>,
    trips: HashSet<String>,
    records: u64,
    min: Option<DateTime<Utc>>,
    max: Option<DateTime<Utc>>,
    sums: BTreeMap<String, f64>,
    /// Order this group was first observed in, the Top-N tiebreak.
    pub(crate) seq: usize,
}

impl GroupAccumulator {
    /// A fresh group with zeroed sums for each metric field, so a group
    /// that accumulates no numeric value still reports explicit zeros.
    pub fn new(seq: usize, metric_fields: &[String]) -> Self {
        Self {
            seq,
            sums: metric_fields.iter().map(|f| (f.clone(), 0.0)).collect(),
            ..Default::default()
        }
    }

    /// Fold one admitted record into the group.
    pub fn observe(&mut self, record: &MetricRecord, ts: DateTime<Utc>, spec: &EndpointSpec) {
        self.records += 1;

        for (field, sum) in self.sums.iter_mut() {
            *sum += record.metric(field);
        }

        // Distinct counts are over non-empty identifiers only.
        if let Some(driver) = record.get(spec.driver_column).filter(|v| !v.is_empty()) {
            if !self.drivers.contains(driver) {
                self.drivers.insert(driver.to_string());
            }
        }
        if let Some(trip) = record.get(spec.trip_column).filter(|v| !v.is_empty()) {
            if !self.trips.contains(trip) {
                self.trips.insert(trip.to_string());
            }
        }

        self.min = Some(self.min.map_or(ts, |m| m.min(ts)));
        self.max = Some(self.max.map_or(ts, |m| m.max(ts)));
    }

    /// Records folded into this group so far.
    pub fn record_count(&self) -> u64 {
        self.records
    }

    /// Finalize after the stream has ended.
    pub fn finish(self) -> GroupSummary {
        GroupSummary {
            driver_count: self.drivers.len() as u64,
            trip_count: self.trips.len() as u64,
            record_count: self.records,
            min_date: self.min.map(format_date),
            max_date: self.max.map(format_date),
            metrics: self.sums,
        }
    }
}

fn format_date(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
