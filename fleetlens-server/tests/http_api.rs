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

//! End-to-end tests over the HTTP surface, backed by CSV fixtures on disk.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use fleetlens_core::catalog::{BLT_EXPORT, DI_EXPORT, SDK_EXPORT};
use fleetlens_server::config::ServerConfig;
use fleetlens_server::{build_router, build_state};
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;
use tower::ServiceExt;

const BLT_CSV: &str = "\
date,driver_id,trip_id,os_category,failed_process_count,successful_process_count,battery_drain
2024-01-01,D1,T1,iOS,1,9,55
2024-01-01,D2,T2,Android,2,8,60
2024-01-02,D1,T3,iOS,0,10,40
";

const DI_CSV: &str = "\
date,driver_id,trip_id,phone_model,sdk_version,device_os,pipeline_component,rating_region,events_received,events_dropped
2024-01-01,D1,T1,iPhone 13,2.1.0,iOS,collector,west,100,1
2024-01-01,D2,T2,Pixel 8,2.1.0,Android,collector,east,50,2
2024-01-02,D1,T3,iPhone 13,2.2.0,iOS,uploader,west,75,0
";

const SDK_CSV: &str = "\
date,driver_id,trip_id,phone_model,device_os,rating_region,code_long_description,Segment_upload_failed,Segment_upload_succeeded,segment_size,operation_time
2024-01-01,D1,T1,iPhone 13,iOS,west,ok,1,9,100,5
2024-01-01,D2,T2,Pixel 8,Android,east,ok,0,5,50,3
2024-01-02,D1,T3,iPhone13 Pro,iOS,west,upload retried,2,8,80,4
";

fn fixture_app() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    for (export, content) in [
        (BLT_EXPORT, BLT_CSV),
        (DI_EXPORT, DI_CSV),
        (SDK_EXPORT, SDK_CSV),
    ] {
        let path = dir.path().join(export);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    let mut config = ServerConfig::default();
    config.data.data_dir = dir.path().to_path_buf();
    let app = build_router(build_state(&config), true);
    (dir, app)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn blt_metrics_sums_only_pinned_columns() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(&app, "/api/telematics/metrics/blt_metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["failed_process_count"], 3.0);
    assert_eq!(body["successful_process_count"], 27.0);
    assert_eq!(body["driver_count"], 2);
    assert_eq!(body["trip_count"], 3);
    assert_eq!(body["record_count"], 3);
    assert_eq!(body["min_date"], "2024-01-01T00:00:00Z");
    assert_eq!(body["max_date"], "2024-01-02T00:00:00Z");
    // Diagnostic columns stay out of the pinned allowlist.
    assert!(body.get("battery_drain").is_none());
}

#[tokio::test]
async fn blt_metrics_device_os_filter_is_case_insensitive() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(&app, "/api/telematics/metrics/blt_metrics?deviceOS=ios").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record_count"], 2);
    assert_eq!(body["failed_process_count"], 1.0);
    assert_eq!(body["successful_process_count"], 19.0);
}

#[tokio::test]
async fn di_metrics_infers_metric_columns() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(&app, "/api/telematics/metrics/di_metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events_received"], 225.0);
    assert_eq!(body["events_dropped"], 3.0);
    // Dimension columns are never summed.
    assert!(body.get("rating_region").is_none());
    assert!(body.get("phone_model").is_none());
}

#[tokio::test]
async fn di_metrics_date_bounds_narrow_the_pass() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(
        &app,
        "/api/telematics/metrics/di_metrics?startTimestamp=2024-01-02",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record_count"], 1);
    assert_eq!(body["events_received"], 75.0);
}

#[tokio::test]
async fn unparsable_date_bound_is_a_400() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(
        &app,
        "/api/telematics/metrics/di_metrics?startTimestamp=tomorrow",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("startTimestamp"));
}

#[tokio::test]
async fn sdk_metrics_fuzzy_model_filter() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(
        &app,
        "/api/telematics/metrics/sdk_metrics?phoneModel=iPhone%2013",
    )
    .await;

    // "iPhone 13" and "iPhone13 Pro" both normalize onto the same token.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record_count"], 2);
    assert_eq!(body["Segment_upload_failed"], 3.0);
}

#[tokio::test]
async fn di_region_returns_ranked_categories() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(&app, "/api/telematics/metrics/di_region").await;

    assert_eq!(status, StatusCode::OK);
    let ranked = body.as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["category"], "west");
    assert_eq!(ranked[0]["count"], 2);
    assert_eq!(ranked[1]["category"], "east");
    assert_eq!(ranked[1]["count"], 1);
}

#[tokio::test]
async fn pipeline_report_groups_by_day() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(&app, "/api/telematics/metrics/pipeline_report").await;

    assert_eq!(status, StatusCode::OK);
    let days = body.as_object().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(body["2024-01-01"]["Segment_upload_succeeded"], 14.0);
    assert_eq!(body["2024-01-01"]["trip_count"], 2);
    assert_eq!(body["2024-01-02"]["segment_size"], 80.0);
}

#[tokio::test]
async fn fields_requires_the_field_parameter() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(&app, "/api/telematics/metrics/fields").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("field"));
}

#[tokio::test]
async fn fields_lists_distinct_values_in_file_order() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(
        &app,
        "/api/telematics/metrics/fields?field=rating_region",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!(["west", "east"]));
}

#[tokio::test]
async fn missing_export_is_an_internal_error() {
    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig::default();
    config.data.data_dir = dir.path().to_path_buf();
    let app = build_router(build_state(&config), true);

    let (status, body) = get(&app, "/api/telematics/metrics/di_metrics").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("unknown export"));
}

#[tokio::test]
async fn health_reports_version_and_cache() {
    let (_dir, app) = fixture_app();
    let (status, body) = get(&app, "/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["cache"]["entries"].is_u64());
}
