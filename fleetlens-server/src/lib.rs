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

pub mod api;
pub mod config;

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{
    blt_metrics, di_metrics, di_region_metrics, field_values, health_check_detailed,
    pipeline_report, sdk_metrics, AppState,
};
use config::ServerConfig;
use fleetlens_engine::{AggregationEngine, ResultCache};
use fleetlens_engine::cache::ResultCacheConfig;
use fleetlens_source::CsvDirSource;

/// Build the application state from a validated configuration.
pub fn build_state(config: &ServerConfig) -> AppState {
    let source = Arc::new(CsvDirSource::new(
        config.data.data_dir.clone(),
        Duration::from_secs(config.data.read_deadline_secs),
    ));
    let cache = ResultCache::new(ResultCacheConfig {
        max_entries: config.cache.max_entries,
        ttl: Duration::from_secs(config.cache.ttl_secs),
    });
    let engine = Arc::new(AggregationEngine::new(source, cache.clone()));

    AppState {
        engine,
        cache,
        started_at: Instant::now(),
    }
}

/// Build the HTTP router. Split out of [`run_server`] so integration tests
/// can drive it without binding a socket.
pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .route("/api/telematics/metrics/blt_metrics", get(blt_metrics))
        .route("/api/telematics/metrics/di_metrics", get(di_metrics))
        .route("/api/telematics/metrics/sdk_metrics", get(sdk_metrics))
        .route("/api/telematics/metrics/di_region", get(di_region_metrics))
        .route(
            "/api/telematics/metrics/pipeline_report",
            get(pipeline_report),
        )
        .route("/api/telematics/metrics/fields", get(field_values))
        .route("/api/v1/health", get(health_check_detailed))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetlens_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Fleetlens Server");
    tracing::info!("Configuration: {:#?}", config);

    config.validate()?;

    let addr = config.socket_addr()?;
    let state = build_state(&config);
    let app = build_router(state, config.server.enable_cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP API listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
