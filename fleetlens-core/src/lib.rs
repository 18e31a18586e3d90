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

//! Core data model for the Fleetlens telemetry dashboard backend.
//!
//! This crate owns the vocabulary shared by the row source, the aggregation
//! engine, and the HTTP layer: tabular records, query filters, and the
//! declarative per-endpoint aggregation table.

pub mod catalog;
pub mod endpoint;
pub mod query;
pub mod record;

pub use endpoint::{
    EndpointSpec, FilterField, GroupingMode, MatchKind, MetricFieldPolicy, END_PARAM, START_PARAM,
};
pub use query::QuerySpec;
pub use record::MetricRecord;
