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

//! Filter compiler: turns a query's optional parameters into a single
//! conjunctive predicate over a record.
//!
//! Compilation validates the request (an unparsable date bound is a 400,
//! raised before the row source is ever opened); evaluation is per-record
//! and cheap. A record whose date column is missing or unparsable is
//! rejected here, which is also how malformed rows are excluded from the
//! accumulators without aborting the pass.

use chrono::{DateTime, Utc};
use fleetlens_core::record::parse_timestamp;
use fleetlens_core::{EndpointSpec, MatchKind, MetricRecord, QuerySpec, END_PARAM, START_PARAM};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::EngineError;

/// First letter-digit boundary joiner, e.g. "iPhone13" -> "iPhone 13".
static LETTER_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z])(\d)").unwrap());

/// `"<Brand> <digits>"` token inside a normalized model string.
static MODEL_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+ \d{1,2}").unwrap());

/// One compiled categorical constraint.
#[derive(Debug, Clone)]
enum FieldPredicate {
    Exact {
        column: &'static str,
        value: String,
    },
    CaseInsensitive {
        column: &'static str,
        value_lower: String,
    },
    /// Lossy containment on normalized model strings, see [`model_token`].
    FuzzyModel {
        column: &'static str,
        token: String,
    },
}

impl FieldPredicate {
    fn matches(&self, record: &MetricRecord) -> bool {
        match self {
            FieldPredicate::Exact { column, value } => record.get(column) == Some(value.as_str()),
            FieldPredicate::CaseInsensitive {
                column,
                value_lower,
            } => record
                .get(column)
                .is_some_and(|v| v.eq_ignore_ascii_case(value_lower)),
            FieldPredicate::FuzzyModel { column, token } => record
                .get(column)
                .is_some_and(|v| normalize_model(v).contains(token.as_str())),
        }
    }
}

/// A query compiled against one endpoint's filter table.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    date_column: &'static str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    predicates: Vec<FieldPredicate>,
}

impl CompiledFilter {
    /// Compile the query. Every present filter must be recognized by the
    /// endpoint (the query layer guarantees this) and present date bounds
    /// must parse.
    pub fn compile(spec: &EndpointSpec, query: &QuerySpec) -> Result<Self, EngineError> {
        let start = parse_bound(query.start.as_deref(), START_PARAM)?;
        let end = parse_bound(query.end.as_deref(), END_PARAM)?;

        let mut predicates = Vec::with_capacity(query.filters.len());
        for (param, value) in &query.filters {
            let field = spec.filter(param).ok_or_else(|| {
                EngineError::BadRequest(format!("unrecognized filter parameter: {param}"))
            })?;
            predicates.push(match field.matching {
                MatchKind::Exact => FieldPredicate::Exact {
                    column: field.column,
                    value: value.clone(),
                },
                MatchKind::CaseInsensitive => FieldPredicate::CaseInsensitive {
                    column: field.column,
                    value_lower: value.to_ascii_lowercase(),
                },
                MatchKind::FuzzyModel => FieldPredicate::FuzzyModel {
                    column: field.column,
                    token: model_token(value),
                },
            });
        }

        Ok(Self {
            date_column: spec.date_column,
            start,
            end,
            predicates,
        })
    }

    /// Test a record. Returns its parsed timestamp when every present
    /// constraint holds, `None` when the record is filtered out or carries
    /// no usable date.
    pub fn admit(&self, record: &MetricRecord) -> Option<DateTime<Utc>> {
        let ts = record.timestamp(self.date_column)?;
        if self.start.is_some_and(|start| ts < start) {
            return None;
        }
        if self.end.is_some_and(|end| ts > end) {
            return None;
        }
        if self.predicates.iter().all(|p| p.matches(record)) {
            Some(ts)
        } else {
            None
        }
    }
}

fn parse_bound(raw: Option<&str>, param: &str) -> Result<Option<DateTime<Utc>>, EngineError> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| EngineError::BadRequest(format!("unparsable {param}: {raw}"))),
    }
}

/// Insert a space at every letter-digit boundary so "iPhone13" and
/// "iPhone 13" compare equal.
fn normalize_model(raw: &str) -> String {
    LETTER_DIGIT.replace_all(raw, "$1 $2").into_owned()
}

/// Canonical `"<Brand> <digits>"` token of a filter value, falling back to
/// the whole normalized value when no such token exists. The resulting
/// containment test is deliberately lossy: it absorbs formatting variance
/// between data sources ("iPhone13" vs "iPhone 13 Pro") at the price of
/// matching any model whose normalized name contains the token.
fn model_token(raw: &str) -> String {
    let normalized = normalize_model(raw);
    match MODEL_TOKEN.find(&normalized) {
        Some(m) => m.as_str().to_string(),
        None => normalized,
    }
}
