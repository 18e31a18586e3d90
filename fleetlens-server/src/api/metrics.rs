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

//! Aggregation endpoints for the telematics dashboards.
//!
//! Each handler binds one entry of the endpoint catalog to a route; the
//! engine does the rest. Unknown query parameters are ignored, present
//! ones narrow the pass.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use fleetlens_core::catalog::{
    BLT_METRICS, DI_METRICS, DI_REGION, PIPELINE_REPORT, SDK_METRICS,
};
use fleetlens_core::{EndpointSpec, QuerySpec};
use std::collections::HashMap;

use crate::api::{ApiError, AppState};

async fn aggregate(
    state: &AppState,
    spec: &EndpointSpec,
    params: &HashMap<String, String>,
) -> Result<impl IntoResponse, ApiError> {
    let query = QuerySpec::from_params(spec, params);
    let output = state.engine.run(spec, &query).await?;
    Ok(Json((*output).clone()))
}

/// GET /api/telematics/metrics/blt_metrics
pub async fn blt_metrics(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    aggregate(&state, &BLT_METRICS, &params).await
}

/// GET /api/telematics/metrics/di_metrics
pub async fn di_metrics(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    aggregate(&state, &DI_METRICS, &params).await
}

/// GET /api/telematics/metrics/sdk_metrics
pub async fn sdk_metrics(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    aggregate(&state, &SDK_METRICS, &params).await
}

/// GET /api/telematics/metrics/di_region - top regions by record count
pub async fn di_region_metrics(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    aggregate(&state, &DI_REGION, &params).await
}

/// GET /api/telematics/metrics/pipeline_report - per-day summaries
pub async fn pipeline_report(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    aggregate(&state, &PIPELINE_REPORT, &params).await
}

/// GET /api/telematics/metrics/fields?field=<column>
///
/// Distinct values of one column of the DI export, for the dashboard
/// filter dropdowns. The `field` parameter is mandatory; date bounds are
/// honored, other filters do not apply here.
pub async fn field_values(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let column = params
        .get("field")
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing required parameter: field".to_string()))?;

    let query = QuerySpec::from_params(&DI_METRICS, &params);
    let values = state
        .engine
        .distinct_values(&DI_METRICS, &query, column)
        .await?;
    Ok(Json(values))
}
