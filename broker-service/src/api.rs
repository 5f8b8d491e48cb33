use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use shared::{FailedEvent, InventoryDay, StayWindow};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::{ErrorCode, ProcessingError};
use crate::ingestion::{new_correlation_id, EventHeaders, IngestionCoordinator, IngestionOutcome};
use crate::processing::ReservationEngine;
use crate::store::FailedEventSink;

pub const HEADER_EVENT_ID: &str = "x-event-id";
pub const HEADER_PLATFORM: &str = "x-platform";
pub const HEADER_EVENT_TYPE: &str = "x-event-type";
pub const HEADER_CORRELATION_ID: &str = "x-correlation-id";

const DEFAULT_FAILED_EVENT_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: IngestionCoordinator,
    pub engine: ReservationEngine,
    pub failed_events: Arc<dyn FailedEventSink>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub event_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// An error response in the broker's wire format.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    reason: String,
    event_id: Option<String>,
    trace_id: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            event_id: None,
            trace_id: None,
        }
    }

    fn for_event(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    fn traced(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code,
            reason: self.reason,
            details: self
                .event_id
                .map(|id| BTreeMap::from([("eventId".to_string(), id)])),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            trace_id: self.trace_id,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Rejected(reason) => ApiError::new(reason.into(), reason.as_str()),
            ProcessingError::Store(e) => {
                tracing::error!("Inventory update failed: {}", e);
                ApiError::new(ErrorCode::InternalError, ErrorCode::InternalError.default_reason())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(ErrorCode::ValidationError, rejection.body_text())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/events", post(receive_event))
        .route("/api/failed-events", get(list_failed_events))
        .route("/api/failed-events/:id/resolve", post(resolve_failed_event))
        .route("/api/rooms/:room_id/blocks", post(block_room).delete(unblock_room))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn receive_event(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let correlation_id = header(&headers, HEADER_CORRELATION_ID).unwrap_or_else(new_correlation_id);

    let mut response = match header(&headers, HEADER_PLATFORM) {
        None => ApiError::new(ErrorCode::ValidationError, "missing required header X-Platform")
            .traced(correlation_id.as_str())
            .into_response(),
        Some(platform) => {
            let event_headers = EventHeaders {
                event_id: header(&headers, HEADER_EVENT_ID),
                platform: Some(platform),
                event_type: header(&headers, HEADER_EVENT_TYPE),
                correlation_id: Some(correlation_id.clone()),
            };

            match state.coordinator.process_bytes(&body, &event_headers).await {
                IngestionOutcome::Accepted { event_id } => Json(EventResponse {
                    event_id,
                    status: "ACCEPTED".to_string(),
                    message: "event processed".to_string(),
                })
                .into_response(),
                IngestionOutcome::Rejected { event_id, code, reason } => ApiError::new(code, reason)
                    .for_event(event_id)
                    .traced(correlation_id.as_str())
                    .into_response(),
            }
        }
    };

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(HEADER_CORRELATION_ID, value);
    }
    response
}

#[derive(Debug, Deserialize)]
pub struct FailedEventQuery {
    pub limit: Option<usize>,
}

pub async fn list_failed_events(
    State(state): State<AppState>,
    Query(query): Query<FailedEventQuery>,
) -> Result<Json<Vec<FailedEvent>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_FAILED_EVENT_LIMIT);
    state
        .failed_events
        .recent(limit)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to list failed events: {}", e);
            ApiError::new(ErrorCode::InternalError, ErrorCode::InternalError.default_reason())
        })
}

pub async fn resolve_failed_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.failed_events.resolve(id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Ok(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to resolve failed event {}: {}", id, e);
            Err(ApiError::new(ErrorCode::InternalError, ErrorCode::InternalError.default_reason()))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub reason: Option<String>,
}

impl BlockRequest {
    fn window(&self) -> Result<StayWindow, ApiError> {
        StayWindow::new(self.check_in, self.check_out).ok_or_else(|| {
            ApiError::new(ErrorCode::ValidationError, "checkOut must be after checkIn")
        })
    }
}

pub async fn block_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    request: Result<Json<BlockRequest>, JsonRejection>,
) -> Result<Json<Vec<InventoryDay>>, ApiError> {
    let Json(request) = request?;
    let window = request.window()?;
    let reason = request.reason.as_deref().unwrap_or("blocked");

    state
        .engine
        .block(room_id, window, reason)
        .await
        .map(Json)
        .map_err(ApiError::from)
}

pub async fn unblock_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    request: Result<Json<BlockRequest>, JsonRejection>,
) -> Result<Json<Vec<InventoryDay>>, ApiError> {
    let Json(request) = request?;
    let window = request.window()?;

    state
        .engine
        .unblock(room_id, window)
        .await
        .map(Json)
        .map_err(ApiError::from)
}

pub async fn health_check() -> &'static str {
    "OK"
}
