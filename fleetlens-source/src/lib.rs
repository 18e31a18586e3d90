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

//! Row sources: ordered, lazy, forward-only streams of tabular records.
//!
//! The aggregation engine never touches files directly; it consumes a
//! [`RowSource`], which yields one [`MetricRecord`] at a time in file
//! order. Streams are finite and not restartable mid-pass: a failed read
//! aborts the pass and the caller re-issues the request.

pub mod csv_dir;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use fleetlens_core::MetricRecord;
use futures::Stream;
use thiserror::Error;

pub use csv_dir::CsvDirSource;

/// Errors surfaced by a row source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unknown export: {0}")]
    UnknownExport(String),

    #[error("invalid export name: {0}")]
    InvalidExport(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed export: {0}")]
    Csv(#[from] csv::Error),

    #[error("read deadline of {0:?} exceeded")]
    Deadline(Duration),
}

/// A finite, forward-only stream of records from one export.
pub type RowStream = Pin<Box<dyn Stream<Item = Result<MetricRecord, SourceError>> + Send>>;

/// Supplies the ordered row stream of a named tabular export.
///
/// Values are strings prior to numeric coercion; coercion is the consumer's
/// job. A stream terminates normally at end-of-file or abnormally with a
/// single trailing `Err` item, after which no further rows are produced.
#[async_trait]
pub trait RowSource: Send + Sync + 'static {
    async fn open(&self, export: &str) -> Result<RowStream, SourceError>;
}
