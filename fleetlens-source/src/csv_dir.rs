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

//! CSV row source backed by a local data directory.
//!
//! Decoding runs on a blocking thread with the `csv` crate and rows are
//! forwarded over a bounded channel, so a pass holds O(channel capacity)
//! rows in flight rather than the whole file. Each receive is bounded by a
//! read deadline: a stalled producer fails the pass instead of hanging it.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use fleetlens_core::MetricRecord;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{RowSource, RowStream, SourceError};

/// Rows buffered between the decoder thread and the consumer.
const ROW_CHANNEL_CAPACITY: usize = 256;

/// Row source reading CSV exports from a directory tree.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    root: PathBuf,
    read_deadline: Duration,
}

impl CsvDirSource {
    pub fn new(root: impl Into<PathBuf>, read_deadline: Duration) -> Self {
        Self {
            root: root.into(),
            read_deadline,
        }
    }

    /// Resolve an export name under the data root. Absolute paths and
    /// parent-directory components are rejected before touching the
    /// filesystem.
    fn resolve(&self, export: &str) -> Result<PathBuf, SourceError> {
        let rel = Path::new(export);
        if rel.as_os_str().is_empty()
            || rel.is_absolute()
            || rel.components().any(|c| matches!(c, Component::ParentDir))
        {
            return Err(SourceError::InvalidExport(export.to_string()));
        }

        let path = self.root.join(rel);
        if !path.is_file() {
            return Err(SourceError::UnknownExport(export.to_string()));
        }
        Ok(path)
    }
}

#[async_trait]
impl RowSource for CsvDirSource {
    async fn open(&self, export: &str) -> Result<RowStream, SourceError> {
        let path = self.resolve(export)?;
        debug!(export, path = %path.display(), "opening export");

        let (tx, mut rx) = mpsc::channel::<Result<MetricRecord, SourceError>>(ROW_CHANNEL_CAPACITY);
        tokio::task::spawn_blocking(move || decode_rows(&path, tx));

        let deadline = self.read_deadline;
        let rows = stream! {
            loop {
                match tokio::time::timeout(deadline, rx.recv()).await {
                    Err(_) => {
                        yield Err(SourceError::Deadline(deadline));
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(item)) => {
                        let failed = item.is_err();
                        yield item;
                        if failed {
                            break;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(rows))
    }
}

/// Blocking decode loop. Record-level errors (bad UTF-8, mangled quoting)
/// are skipped so one corrupt row never aborts a pass; I/O errors terminate
/// the stream with a trailing `Err`.
fn decode_rows(path: &Path, tx: mpsc::Sender<Result<MetricRecord, SourceError>>) {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            let _ = tx.blocking_send(Err(e.into()));
            return;
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            let _ = tx.blocking_send(Err(e.into()));
            return;
        }
    };

    for row in reader.records() {
        match row {
            Ok(record) => {
                let fields: HashMap<String, String> = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect();
                if tx.blocking_send(Ok(MetricRecord::new(fields))).is_err() {
                    // Consumer went away; stop decoding.
                    return;
                }
            }
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                let _ = tx.blocking_send(Err(e.into()));
                return;
            }
            Err(e) => {
                trace!(error = %e, "skipping malformed record");
            }
        }
    }
}
