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

//! The aggregation engine: one pass over a row source per cache miss.
//!
//! Request flow: compile the filter (request errors surface before any
//! stream is opened), build the canonical cache key, and ask the result
//! cache for the key — computing, at most once per key across concurrent
//! callers, a full pass: open the stream, resolve metric fields (first
//! record, when inferring), then filter / group / accumulate every record
//! sequentially and finalize. A source failure mid-pass aborts the whole
//! request; nothing partial is ever cached.

use fleetlens_core::{EndpointSpec, GroupingMode, QuerySpec};
use fleetlens_source::RowSource;
use futures::StreamExt;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::accumulator::GroupSummary;
use crate::cache::ResultCache;
use crate::filter::CompiledFilter;
use crate::group::{self, GroupTable, SINGLE_KEY};
use crate::schema;
use crate::EngineError;

/// One ranked category group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Finalized result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregationOutput {
    /// Ungrouped totals, flattened.
    Totals(GroupSummary),
    /// Per-day summaries keyed by ISO calendar day, ascending.
    Daily(BTreeMap<String, GroupSummary>),
    /// Category groups ranked by record count, truncated to top N.
    Ranked(Vec<CategoryCount>),
}

/// Streaming aggregation engine over one row source.
///
/// All state lives in explicitly constructed collaborators handed in here;
/// the engine itself is cheap to clone and share across requests.
pub struct AggregationEngine<S: RowSource> {
    source: Arc<S>,
    cache: ResultCache,
}

impl<S: RowSource> AggregationEngine<S> {
    pub fn new(source: Arc<S>, cache: ResultCache) -> Self {
        Self { source, cache }
    }

    /// Run one aggregation request, read-through cached.
    pub async fn run(
        &self,
        spec: &EndpointSpec,
        query: &QuerySpec,
    ) -> Result<Arc<AggregationOutput>, EngineError> {
        let filter = CompiledFilter::compile(spec, query)?;
        let key = query.canonical_key(spec);
        debug!(endpoint = spec.name, %key, "aggregation request");
        self.cache
            .get_or_compute(key, self.compute(spec, filter))
            .await
    }

    /// One full pass over the export. Only reached on a cache miss.
    async fn compute(
        &self,
        spec: &EndpointSpec,
        filter: CompiledFilter,
    ) -> Result<AggregationOutput, EngineError> {
        let mut rows = self.source.open(spec.export).await?;

        let mut metric_fields = schema::resolve_static(&spec.metrics);
        let mut table = GroupTable::new();
        let single = matches!(spec.grouping, GroupingMode::Single);

        // With a pinned allowlist the implicit group exists up front, so a
        // pass that admits no records still reports explicit zeros.
        if single {
            if let Some(fields) = &metric_fields {
                table.entry(SINGLE_KEY.to_string(), fields);
            }
        }

        let mut admitted = 0u64;
        while let Some(item) = rows.next().await {
            let record = item?;

            if metric_fields.is_none() {
                let fields = schema::resolve_from_record(&spec.metrics, &record);
                if single {
                    table.entry(SINGLE_KEY.to_string(), &fields);
                }
                metric_fields = Some(fields);
            }
            let fields = match &metric_fields {
                Some(fields) => fields,
                None => continue,
            };

            let Some(ts) = filter.admit(&record) else {
                continue;
            };
            admitted += 1;

            let Some(key) = group::assign(&spec.grouping, &record, ts) else {
                continue;
            };
            table.entry(key, fields).observe(&record, ts, spec);
        }

        debug!(
            endpoint = spec.name,
            admitted,
            groups = table.len(),
            "pass finished"
        );

        Ok(match spec.grouping {
            GroupingMode::Single => {
                let summary = table
                    .remove(SINGLE_KEY)
                    .map(|acc| acc.finish())
                    .unwrap_or_default();
                AggregationOutput::Totals(summary)
            }
            GroupingMode::ByDay => AggregationOutput::Daily(table.into_summaries().collect()),
            GroupingMode::ByCategory { top_n, .. } => AggregationOutput::Ranked(
                table
                    .top_by_count(top_n)
                    .into_iter()
                    .map(|(category, count)| CategoryCount { category, count })
                    .collect(),
            ),
        })
    }

    /// Distinct non-empty values of one column, date-filtered, in
    /// first-observed order. Uncached: the dashboards call this once per
    /// page load to populate filter dropdowns.
    pub async fn distinct_values(
        &self,
        spec: &EndpointSpec,
        query: &QuerySpec,
        column: &str,
    ) -> Result<Vec<String>, EngineError> {
        let filter = CompiledFilter::compile(spec, query)?;
        let mut rows = self.source.open(spec.export).await?;

        let mut seen = HashSet::new();
        let mut values = Vec::new();
        while let Some(item) = rows.next().await {
            let record = item?;
            if filter.admit(&record).is_none() {
                continue;
            }
            if let Some(value) = record.get(column).filter(|v| !v.is_empty()) {
                if seen.insert(value.to_string()) {
                    values.push(value.to_string());
                }
            }
        }

        if values.is_empty() {
            warn!(endpoint = spec.name, column, "no distinct values found");
        }
        Ok(values)
    }
}
