//! HTTP surface
//!
//! Read-only routes serving whatever the publisher last published:
//! - `GET /healthz`        liveness
//! - `GET /api/report`     report JSON with publication envelope
//! - `GET /api/report.md`  condensed Markdown for sharing
//! - `GET /api/doctor`     hub overview (version, entity counts, uptime)
//!
//! A report that could not be produced at all is a 503, never an empty
//! healthy-looking body. The overview only needs the hub to answer, so it
//! is served even when analysis failed; 502 means the last fetch failed.

use crate::poller::ReportPublisher;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<ReportPublisher>,
    pub started: Instant,
}

impl AppState {
    pub fn new(publisher: Arc<ReportPublisher>) -> Self {
        Self {
            publisher,
            started: Instant::now(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { Json(json!({"ok": true})) }))
        .route("/api/report", get(get_report))
        .route("/api/report.md", get(get_report_markdown))
        .route("/api/doctor", get(get_doctor))
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", addr);
    axum::serve(listener, build_router(state)).await
}

async fn get_report(State(state): State<AppState>) -> Response {
    let published = state.publisher.current();
    let status = if published.is_available() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(published.envelope())).into_response()
}

async fn get_report_markdown(State(state): State<AppState>) -> Response {
    let published = state.publisher.current();

    let Some(diagnosis) = &published.diagnosis else {
        let reason = published.error.as_deref().unwrap_or("unknown error");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Could not analyze the hub: {}\n", reason),
        )
            .into_response();
    };

    let mut body = String::new();
    if published.stale {
        body.push_str(&format!(
            "> Showing the last successful report. Latest poll failed: {}\n\n",
            published.error.as_deref().unwrap_or("unknown error")
        ));
    }
    body.push_str(&diagnosis.report.to_markdown());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        body,
    )
        .into_response()
}

async fn get_doctor(State(state): State<AppState>) -> Response {
    let published = state.publisher.current();
    let uptime = state.started.elapsed().as_secs();

    match &published.overview {
        Some(o) => Json(json!({
            "ha_version": o.ha_version,
            "location_name": o.location_name,
            "time_zone": o.time_zone,
            "unit_system": o.unit_system,
            "entity_count": o.entity_count,
            "domain_counts": o.domain_counts,
            "homeops_uptime_s": uptime,
        }))
        .into_response(),
        None => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "hub unavailable",
                "detail": published.error,
                "homeops_uptime_s": uptime,
            })),
        )
            .into_response(),
    }
}
