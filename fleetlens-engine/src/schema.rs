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

//! Metric-field resolution: fixed allowlist or first-record inference.

use fleetlens_core::{MetricFieldPolicy, MetricRecord};
use tracing::debug;

/// Resolve an explicit allowlist without looking at any record. Returns
/// `None` for inferring policies, which need the first streamed record.
pub fn resolve_static(policy: &MetricFieldPolicy) -> Option<Vec<String>> {
    match policy {
        MetricFieldPolicy::Explicit(fields) => {
            Some(fields.iter().map(|f| f.to_string()).collect())
        }
        MetricFieldPolicy::Infer { .. } => None,
    }
}

/// Resolve metric fields from the first record of a pass: every field not
/// named in the policy's exclusion list is summed. Happens exactly once per
/// pass; the record itself still filters and accumulates like any other
/// row. Field order is normalized so inferred passes are deterministic.
pub fn resolve_from_record(policy: &MetricFieldPolicy, first: &MetricRecord) -> Vec<String> {
    match policy {
        MetricFieldPolicy::Explicit(fields) => fields.iter().map(|f| f.to_string()).collect(),
        MetricFieldPolicy::Infer { exclude } => {
            let mut fields: Vec<String> = first
                .field_names()
                .filter(|name| !exclude.contains(name))
                .map(str::to_string)
                .collect();
            fields.sort_unstable();
            debug!(?fields, "inferred metric fields");
            fields
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(pairs: &[(&str, &str)]) -> MetricRecord {
        MetricRecord::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn explicit_policy_resolves_without_a_record() {
        let policy = MetricFieldPolicy::Explicit(&["a", "b"]);
        assert_eq!(resolve_static(&policy), Some(vec!["a".into(), "b".into()]));
        assert!(resolve_static(&MetricFieldPolicy::Infer { exclude: &[] }).is_none());
    }

    #[test]
    fn inference_keeps_everything_not_excluded() {
        let policy = MetricFieldPolicy::Infer {
            exclude: &["date", "driver_id", "trip_id"],
        };
        let first = record(&[
            ("date", "2024-01-01"),
            ("driver_id", "D1"),
            ("trip_id", "T1"),
            ("metric_b", "2"),
            ("metric_a", "1"),
        ]);
        assert_eq!(
            resolve_from_record(&policy, &first),
            vec!["metric_a".to_string(), "metric_b".to_string()]
        );
    }

    #[test]
    fn a_new_upstream_column_becomes_a_metric() {
        // The documented fragility of inference: nothing distinguishes a
        // new dimension column from a new counter.
        let policy = MetricFieldPolicy::Infer { exclude: &["date"] };
        let first = record(&[("date", "2024-01-01"), ("new_dimension", "west")]);
        assert_eq!(
            resolve_from_record(&policy, &first),
            vec!["new_dimension".to_string()]
        );
    }
}
