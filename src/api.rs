//! HTTP API handlers for Herbtrace.
//!
//! Every data endpoint is a read-only query over a freshly loaded snapshot:
//!
//! - **GET /kpis**: Headline figures.
//! - **GET /events**: Collection events filtered by species and status.
//! - **GET /dashboard**: Everything the overview page renders.
//!
//! When the data source cannot produce a snapshot the handlers answer
//! `503 Service Unavailable` and the client renders its empty state. Stale
//! or partial data is never served.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::activity::ActivityItem;
use crate::aggregation::HarvestStats;
use crate::dashboard::{Dashboard, DashboardResponse, EventView};
use crate::dataset::BatchTrace;
use crate::error::DataError;
use crate::filter::EventQuery;
use crate::model::{KpiData, RecallEvent, ScanRequest};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Dashboard,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/kpis", get(get_kpis))
        .route("/events", get(get_events))
        .route("/events/stats", get(get_event_stats))
        .route("/dashboard", get(get_dashboard))
        .route("/batches/:id", get(get_batch))
        .route("/batches/qr/:code", get(get_batch_by_qr))
        .route("/recalls", get(get_recalls))
        .route("/activity", get(get_activity))
        .route("/scans", post(post_scan))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Map a snapshot failure to a response status.
fn snapshot_failure(endpoint: &str, err: DataError) -> StatusCode {
    warn!(endpoint, error = %err, "Snapshot unavailable");
    StatusCode::SERVICE_UNAVAILABLE
}

/// GET /kpis - Headline dashboard figures.
///
/// # Response
///
/// ```json
/// {
///     "complianceRate": 50.0,
///     "seasonalComplianceRate": 100.0,
///     "fairTradePercentage": 50.0,
///     "sustainabilityScore": 7.35,
///     "activeRecalls": 1,
///     "totalBatches": 2,
///     "recentScans": 15420
/// }
/// ```
#[instrument(skip(state))]
pub async fn get_kpis(State(state): State<AppState>) -> Result<Json<KpiData>, StatusCode> {
    match state.dashboard.kpis().await {
        Ok(kpis) => {
            info!(
                compliance_rate = kpis.compliance_rate,
                active_recalls = kpis.active_recalls,
                "KPIs queried"
            );
            Ok(Json(kpis))
        }
        Err(e) => Err(snapshot_failure("/kpis", e)),
    }
}

/// GET /events - Collection events for the harvest monitor.
///
/// # Query Parameters
///
/// - `species` (optional): Substring of the species name, or `all` (default)
/// - `status` (optional): `compliant`, `violation`, `pending` or `all` (default)
///
/// Each item carries the record's own fields plus a tagged `compliance`
/// value, e.g. `{"status": "violation", "reasons": ["geoFence"]}`.
///
/// An unknown status is rejected with `400 Bad Request`.
#[instrument(skip(state))]
pub async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<EventView>>, StatusCode> {
    match state.dashboard.events(&query).await {
        Ok(events) => {
            info!(
                species = %query.species,
                status = ?query.status,
                count = events.len(),
                "Events queried"
            );
            Ok(Json(events))
        }
        Err(e) => Err(snapshot_failure("/events", e)),
    }
}

/// GET /events/stats - Harvest figures over the filtered events.
///
/// Accepts the same query parameters as GET /events.
#[instrument(skip(state))]
pub async fn get_event_stats(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<HarvestStats>, StatusCode> {
    state
        .dashboard
        .harvest_stats(&query)
        .await
        .map(Json)
        .map_err(|e| snapshot_failure("/events/stats", e))
}

/// GET /dashboard - Everything the overview page renders.
#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, StatusCode> {
    match state.dashboard.overview().await {
        Ok(response) => {
            info!(
                events = response.harvest.total_events,
                skipped_records = response.skipped_records,
                "Dashboard queried"
            );
            Ok(Json(response))
        }
        Err(e) => Err(snapshot_failure("/dashboard", e)),
    }
}

/// GET /batches/:id - A batch with every record that references it.
#[instrument(skip(state))]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<BatchTrace>, StatusCode> {
    match state.dashboard.batch_trace(&batch_id).await {
        Ok(Some(trace)) => Ok(Json(trace)),
        Ok(None) => {
            info!(batch_id = %batch_id, "Batch not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => Err(snapshot_failure("/batches/:id", e)),
    }
}

/// GET /batches/qr/:code - Trace a batch from its packaging QR code.
#[instrument(skip(state))]
pub async fn get_batch_by_qr(
    State(state): State<AppState>,
    Path(qr_code): Path<String>,
) -> Result<Json<BatchTrace>, StatusCode> {
    match state.dashboard.batch_trace_by_qr(&qr_code).await {
        Ok(Some(trace)) => Ok(Json(trace)),
        Ok(None) => {
            info!(qr_code = %qr_code, "QR code not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => Err(snapshot_failure("/batches/qr/:code", e)),
    }
}

/// GET /recalls - All recall events in dataset order.
#[instrument(skip(state))]
pub async fn get_recalls(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecallEvent>>, StatusCode> {
    state
        .dashboard
        .recalls()
        .await
        .map(Json)
        .map_err(|e| snapshot_failure("/recalls", e))
}

/// Query parameters for GET /activity.
#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    /// Maximum number of items (default: configured activity limit).
    pub limit: Option<usize>,
}

/// GET /activity - Newest-first activity feed.
#[instrument(skip(state))]
pub async fn get_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityItem>>, StatusCode> {
    let limit = query
        .limit
        .unwrap_or_else(|| state.dashboard.activity_limit());

    state
        .dashboard
        .activity(limit)
        .await
        .map(Json)
        .map_err(|e| snapshot_failure("/activity", e))
}

/// POST /scans - Record a consumer QR scan.
///
/// # Request Body
///
/// ```json
/// { "qrCode": "QR-ASH-001-2024" }
/// ```
///
/// # Response
///
/// Returns `202 Accepted` on success, or `501 Not Implemented` when the
/// configured data source does not persist scans.
#[instrument(skip(state, request))]
pub async fn post_scan(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> impl IntoResponse {
    if request.qr_code.trim().is_empty() {
        return StatusCode::BAD_REQUEST;
    }

    let Some(storage) = state.dashboard.source().storage() else {
        warn!(
            source = state.dashboard.source().name(),
            "Scan recording not supported by data source"
        );
        return StatusCode::NOT_IMPLEMENTED;
    };

    match storage.record_scan(&request.qr_code, Utc::now()).await {
        Ok(()) => {
            info!(qr_code = %request.qr_code, "Scan recorded");
            StatusCode::ACCEPTED
        }
        Err(e) => {
            warn!(qr_code = %request.qr_code, error = %e, "Failed to record scan");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::dashboard::DashboardConfig;
    use crate::dataset::DatasetSource;

    fn fixture_router() -> Router {
        router(AppState {
            dashboard: Dashboard::new(DatasetSource::fixtures(), DashboardConfig::default()),
        })
    }

    #[tokio::test]
    async fn test_health_oneshot() {
        let response = fixture_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_status_is_bad_request() {
        let response = fixture_router()
            .oneshot(
                Request::builder()
                    .uri("/events?status=approved")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
