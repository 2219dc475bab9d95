//! HTTP API for the placement driver
//!
//! Storage nodes post heartbeats and split requests here; operators read
//! and tune the scheduling and replication config.

use crate::common::config::merge_section;
use crate::common::{Config, Error, METRICS};
use crate::coordinator::cache::RegionCache;
use crate::coordinator::cluster::{AskSplitRequest, Cluster, ReportSplitRequest};
use crate::coordinator::region::Region;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub const API_PREFIX: &str = "/pd/api/v1";

const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct CoordState {
    pub cluster: Arc<Cluster>,
    pub cache: Arc<RegionCache>,
    pub config: Arc<RwLock<Config>>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.to_http_status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Creates the HTTP router with all endpoints.
pub fn create_router(state: CoordState) -> Router {
    let api = Router::new()
        .route("/region/heartbeat", post(region_heartbeat))
        .route("/split/ask", post(ask_split))
        .route("/split/report", post(report_split))
        .route("/history/:region_id", get(split_history))
        .route("/regions", get(list_regions))
        .route("/config", get(get_config).post(set_schedule_config))
        .route(
            "/config/schedule",
            get(get_schedule_config).post(set_schedule_config),
        )
        .route(
            "/config/replicate",
            get(get_replication_config).post(set_replication_config),
        );

    Router::new()
        .nest(API_PREFIX, api)
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn region_heartbeat(
    State(state): State<CoordState>,
    Json(region): Json<Region>,
) -> Response {
    match state.cluster.handle_region_heartbeat(&region).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn ask_split(
    State(state): State<CoordState>,
    Json(request): Json<AskSplitRequest>,
) -> Response {
    match state.cluster.handle_ask_split(&request).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn report_split(
    State(state): State<CoordState>,
    Json(request): Json<ReportSplitRequest>,
) -> Response {
    match state.cluster.handle_report_split(&request).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn split_history(
    State(state): State<CoordState>,
    Path(region_id): Path<u64>,
) -> impl IntoResponse {
    Json(state.cluster.histories().get(region_id))
}

async fn list_regions(State(state): State<CoordState>) -> impl IntoResponse {
    Json(state.cache.regions())
}

async fn get_config(State(state): State<CoordState>) -> impl IntoResponse {
    Json(state.config.read().clone())
}

async fn get_schedule_config(State(state): State<CoordState>) -> impl IntoResponse {
    Json(state.config.read().schedule.clone())
}

async fn get_replication_config(State(state): State<CoordState>) -> impl IntoResponse {
    Json(state.config.read().replication.clone())
}

async fn set_schedule_config(
    State(state): State<CoordState>,
    Json(patch): Json<Map<String, Value>>,
) -> Response {
    let mut config = state.config.write();
    let result = merge_section(&config.schedule, patch).and_then(|schedule| {
        schedule.validate()?;
        Ok(schedule)
    });

    match result {
        Ok(schedule) => {
            tracing::info!("Schedule config updated: {:?}", schedule);
            config.schedule = schedule;
            Json(&config.schedule).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn set_replication_config(
    State(state): State<CoordState>,
    Json(patch): Json<Map<String, Value>>,
) -> Response {
    let mut config = state.config.write();
    let result = merge_section(&config.replication, patch).and_then(|replication| {
        replication.validate()?;
        Ok(replication)
    });

    match result {
        Ok(replication) => {
            tracing::info!("Replication config updated: {:?}", replication);
            config.replication = replication;
            Json(&config.replication).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn health(State(state): State<CoordState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": crate::VERSION,
            "regions": state.cache.len(),
        })),
    )
}

async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.to_prometheus(),
    )
}
