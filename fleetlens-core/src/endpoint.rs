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

//! Declarative description of one aggregation endpoint.
//!
//! The dashboard's metrics endpoints all follow the same shape — stream an
//! export, filter, group, accumulate — and differ only in the export file,
//! the recognized filter parameters, the grouping mode, and which columns
//! are summed. Instead of five hand-written endpoint bodies, each endpoint
//! is a static [`EndpointSpec`] row consumed by the aggregation engine.

/// Query parameter carrying the inclusive lower bound of the date filter.
pub const START_PARAM: &str = "startTimestamp";

/// Query parameter carrying the inclusive upper bound of the date filter.
pub const END_PARAM: &str = "endTimestamp";

/// How a categorical filter parameter is matched against its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Case-sensitive string equality.
    Exact,
    /// Case-insensitive equality. Device-OS values arrive with inconsistent
    /// casing across pipelines ("iOS" vs "ios"), so those columns tolerate
    /// case.
    CaseInsensitive,
    /// Lossy phone-model containment match, see the engine's filter module.
    /// This is deliberately approximate: "iPhone13" and "iPhone 13 Pro"
    /// should refer to the same family of devices.
    FuzzyModel,
}

/// One recognized categorical filter: query parameter name, the export
/// column it constrains, and the match semantics.
#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub param: &'static str,
    pub column: &'static str,
    pub matching: MatchKind,
}

/// How filtered records are partitioned into groups.
#[derive(Debug, Clone, Copy)]
pub enum GroupingMode {
    /// All passing records form one implicit group.
    Single,
    /// Group by the record's date truncated to a UTC calendar day.
    ByDay,
    /// Group by a categorical column, keeping the `top_n` groups with the
    /// most records. Records with an empty value in the column stay in the
    /// filter pass but belong to no group.
    ByCategory {
        column: &'static str,
        top_n: usize,
    },
}

/// Which columns are summed during the pass.
#[derive(Debug, Clone, Copy)]
pub enum MetricFieldPolicy {
    /// A pinned allowlist of metric columns.
    Explicit(&'static [&'static str]),
    /// Infer from the first streamed record: every field not in `exclude`
    /// is treated as a numeric metric. Schema-fragile — a new upstream
    /// dimension column silently becomes a metric — so new endpoints
    /// should prefer `Explicit`.
    Infer { exclude: &'static [&'static str] },
}

/// Static description of one aggregation endpoint.
#[derive(Debug, Clone, Copy)]
pub struct EndpointSpec {
    /// Endpoint name, also the cache-key prefix. Must be unique so keys
    /// from different endpoints never collide.
    pub name: &'static str,
    /// Export file, relative to the row source's data root.
    pub export: &'static str,
    /// Column holding the record timestamp.
    pub date_column: &'static str,
    /// Column holding the driver identifier.
    pub driver_column: &'static str,
    /// Column holding the trip identifier.
    pub trip_column: &'static str,
    /// Recognized categorical filters, in declaration order.
    pub filters: &'static [FilterField],
    pub grouping: GroupingMode,
    pub metrics: MetricFieldPolicy,
}

impl EndpointSpec {
    /// Look up a filter by its query parameter name.
    pub fn filter(&self, param: &str) -> Option<&FilterField> {
        self.filters.iter().find(|f| f.param == param)
    }

    /// Every recognized parameter name, date bounds included. This is the
    /// domain of the canonical cache signature.
    pub fn param_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.filters.iter().map(|f| f.param).collect();
        names.push(START_PARAM);
        names.push(END_PARAM);
        names
    }
}
