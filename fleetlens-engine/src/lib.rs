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

//! Streaming metrics aggregation engine.
//!
//! One configurable pipeline replaces the dashboard's per-endpoint
//! aggregation code: stream an export, apply the compiled filter, assign
//! each passing record to a group, accumulate sums / distinct counts /
//! date ranges, then finalize (optionally ranking and truncating the
//! groups). Results are cached under the query's canonical signature with
//! a TTL, and concurrent identical misses are computed once.

pub mod accumulator;
pub mod cache;
pub mod engine;
pub mod filter;
pub mod group;
pub mod schema;

use thiserror::Error;

pub use accumulator::GroupSummary;
pub use cache::ResultCache;
pub use engine::{AggregationEngine, AggregationOutput, CategoryCount};
pub use filter::CompiledFilter;

/// Errors surfaced by an aggregation pass.
///
/// `BadRequest` is raised before any stream is opened; `Source` aborts a
/// pass mid-stream and is never cached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("row source failed: {0}")]
    Source(String),
}

impl From<fleetlens_source::SourceError> for EngineError {
    fn from(e: fleetlens_source::SourceError) -> Self {
        EngineError::Source(e.to_string())
    }
}
