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

pub mod health;
pub mod metrics;

pub use health::health_check_detailed;
pub use metrics::{
    blt_metrics, di_metrics, di_region_metrics, field_values, pipeline_report, sdk_metrics,
};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fleetlens_engine::{AggregationEngine, EngineError, ResultCache};
use fleetlens_source::CsvDirSource;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::BadRequest(msg) => ApiError::BadRequest(msg),
            EngineError::Source(msg) => ApiError::Internal(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AggregationEngine<CsvDirSource>>,
    /// Same cache the engine writes through, held here for health reporting.
    pub cache: ResultCache,
    pub started_at: Instant,
}
