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

//! Filter parameters for one aggregation request and their canonical
//! cache signature.

use std::collections::{BTreeMap, HashMap};

use crate::endpoint::{EndpointSpec, END_PARAM, START_PARAM};

/// Sentinel rendered into the cache key for an absent filter.
const ABSENT: &str = "all";

/// The optional filter values of one request. An absent filter matches
/// everything; grouping is fixed per endpoint, not part of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    /// Raw inclusive lower date bound, validated by the filter compiler.
    pub start: Option<String>,
    /// Raw inclusive upper date bound.
    pub end: Option<String>,
    /// Categorical filters keyed by query parameter name. Only parameters
    /// the endpoint recognizes are ever stored here.
    pub filters: BTreeMap<String, String>,
}

impl QuerySpec {
    /// Build a query from raw request parameters, keeping only the
    /// parameters the endpoint recognizes. Empty values count as absent,
    /// matching how the dashboards send cleared filter boxes.
    pub fn from_params(spec: &EndpointSpec, params: &HashMap<String, String>) -> Self {
        let non_empty = |name: &str| {
            params
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        let filters = spec
            .filters
            .iter()
            .filter_map(|f| non_empty(f.param).map(|v| (f.param.to_string(), v)))
            .collect();

        Self {
            start: non_empty(START_PARAM),
            end: non_empty(END_PARAM),
            filters,
        }
    }

    /// Value for a recognized parameter name, if the filter is present.
    pub fn value_for(&self, name: &str) -> Option<&str> {
        match name {
            START_PARAM => self.start.as_deref(),
            END_PARAM => self.end.as_deref(),
            _ => self.filters.get(name).map(String::as_str),
        }
    }

    /// Canonical cache signature: every recognized parameter name of the
    /// endpoint sorted lexicographically, rendered `name:value` with `all`
    /// for absent filters, joined with `-` under the endpoint's prefix.
    ///
    /// Total and order-independent: two queries that constrain the same
    /// values produce the same key no matter how the request spelled them,
    /// and a present filter always differs from an omitted one.
    pub fn canonical_key(&self, spec: &EndpointSpec) -> String {
        let mut names = spec.param_names();
        names.sort_unstable();

        let parts: Vec<String> = names
            .iter()
            .map(|name| format!("{}:{}", name, self.value_for(name).unwrap_or(ABSENT)))
            .collect();

        format!("{}-{}", spec.name, parts.join("-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DI_METRICS;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn unrecognized_params_are_dropped() {
        let query = QuerySpec::from_params(
            &DI_METRICS,
            &params(&[("deviceOS", "iOS"), ("bogus", "x")]),
        );
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.value_for("deviceOS"), Some("iOS"));
    }

    #[test]
    fn empty_values_count_as_absent() {
        let query = QuerySpec::from_params(
            &DI_METRICS,
            &params(&[("deviceOS", ""), ("startTimestamp", "  ")]),
        );
        assert!(query.filters.is_empty());
        assert!(query.start.is_none());
    }

    #[test]
    fn canonical_key_is_order_independent() {
        let a = QuerySpec::from_params(
            &DI_METRICS,
            &params(&[("deviceOS", "iOS"), ("ratingRegion", "northeast")]),
        );
        let b = QuerySpec::from_params(
            &DI_METRICS,
            &params(&[("ratingRegion", "northeast"), ("deviceOS", "iOS")]),
        );
        assert_eq!(a.canonical_key(&DI_METRICS), b.canonical_key(&DI_METRICS));
    }

    #[test]
    fn canonical_key_distinguishes_present_from_absent() {
        let with = QuerySpec::from_params(&DI_METRICS, &params(&[("deviceOS", "iOS")]));
        let without = QuerySpec::from_params(&DI_METRICS, &params(&[]));
        assert_ne!(
            with.canonical_key(&DI_METRICS),
            without.canonical_key(&DI_METRICS)
        );
    }

    #[test]
    fn canonical_key_renders_absent_as_all() {
        let query = QuerySpec::default();
        let key = query.canonical_key(&DI_METRICS);
        assert!(key.starts_with("di-metrics-"));
        assert!(key.contains("deviceOS:all"));
        assert!(key.contains("startTimestamp:all"));
    }
}
