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

//! Group key assignment and the table of live groups for one pass.

use chrono::{DateTime, Utc};
use fleetlens_core::{GroupingMode, MetricRecord};
use std::collections::HashMap;

use crate::accumulator::{GroupAccumulator, GroupSummary};

/// Key of the implicit group in `Single` mode.
pub const SINGLE_KEY: &str = "";

/// Assign an admitted record to a group, or to none.
///
/// `ByCategory` drops records whose category value is empty or missing:
/// they stay in the overall filter pass (and in any ungrouped view of the
/// same data) but contribute to no group here.
pub fn assign(mode: &GroupingMode, record: &MetricRecord, ts: DateTime<Utc>) -> Option<String> {
    match mode {
        GroupingMode::Single => Some(SINGLE_KEY.to_string()),
        GroupingMode::ByDay => Some(ts.date_naive().to_string()),
        GroupingMode::ByCategory { column, .. } => record
            .get(column)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
    }
}

/// Live groups of one pass, tracking first-observed order for the Top-N
/// tiebreak. Memory is O(distinct groups) plus the identifier sets inside
/// each accumulator, never O(rows).
#[derive(Debug, Default)]
pub struct GroupTable {
    groups: HashMap<String, GroupAccumulator>,
    next_seq: usize,
}

impl GroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The group for `key`, created with zeroed sums on first sight.
    pub fn entry(&mut self, key: String, metric_fields: &[String]) -> &mut GroupAccumulator {
        let next_seq = &mut self.next_seq;
        self.groups.entry(key).or_insert_with(|| {
            let acc = GroupAccumulator::new(*next_seq, metric_fields);
            *next_seq += 1;
            acc
        })
    }

    pub fn remove(&mut self, key: &str) -> Option<GroupAccumulator> {
        self.groups.remove(key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Finalize every group, keyed by group key.
    pub fn into_summaries(self) -> impl Iterator<Item = (String, GroupSummary)> {
        self.groups.into_iter().map(|(k, acc)| (k, acc.finish()))
    }

    /// Rank groups by record count descending and keep the first `n`.
    /// The sort is deterministic: ties break on first-observed order.
    pub fn top_by_count(self, n: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64, usize)> = self
            .groups
            .into_iter()
            .map(|(key, acc)| (key, acc.record_count(), acc.seq))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.truncate(n);
        ranked.into_iter().map(|(key, count, _)| (key, count)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn record(pairs: &[(&str, &str)]) -> MetricRecord {
        MetricRecord::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Map<_, _>>(),
        )
    }

    fn ts(raw: &str) -> DateTime<Utc> {
        fleetlens_core::record::parse_timestamp(raw).unwrap()
    }

    const BY_REGION: GroupingMode = GroupingMode::ByCategory {
        column: "rating_region",
        top_n: 10,
    };

    #[test]
    fn by_day_truncates_to_utc_calendar_day() {
        let rec = record(&[("date", "2024-03-05 13:45:00")]);
        let key = assign(&GroupingMode::ByDay, &rec, ts("2024-03-05 13:45:00"));
        assert_eq!(key.as_deref(), Some("2024-03-05"));
    }

    #[test]
    fn empty_category_assigns_no_group() {
        let when = ts("2024-01-01");
        let blank = record(&[("date", "2024-01-01"), ("rating_region", "  ")]);
        let missing = record(&[("date", "2024-01-01")]);
        let west = record(&[("date", "2024-01-01"), ("rating_region", "west")]);

        assert_eq!(assign(&BY_REGION, &blank, when), None);
        assert_eq!(assign(&BY_REGION, &missing, when), None);
        assert_eq!(assign(&BY_REGION, &west, when).as_deref(), Some("west"));
    }

    #[test]
    fn top_by_count_ranks_and_truncates() {
        let mut table = GroupTable::new();
        let fields: Vec<String> = Vec::new();
        let spec = &fleetlens_core::catalog::DI_REGION;
        let when = ts("2024-01-01");

        // 12 regions; region-i receives i+1 records.
        for i in 0..12 {
            let region = format!("region-{i:02}");
            for _ in 0..=i {
                let rec = record(&[("date", "2024-01-01")]);
                table.entry(region.clone(), &fields).observe(&rec, when, spec);
            }
        }

        let ranked = table.top_by_count(10);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0], ("region-11".to_string(), 12));
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn ties_break_on_first_observed_order() {
        let mut table = GroupTable::new();
        let fields: Vec<String> = Vec::new();
        let spec = &fleetlens_core::catalog::DI_REGION;
        let when = ts("2024-01-01");
        let rec = record(&[("date", "2024-01-01")]);

        for region in ["zulu", "alpha", "mike"] {
            table.entry(region.to_string(), &fields).observe(&rec, when, spec);
        }

        let ranked = table.top_by_count(10);
        let order: Vec<&str> = ranked.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(order, vec!["zulu", "alpha", "mike"]);
    }
}
