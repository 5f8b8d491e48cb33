//! HTTP surface checks against the in-memory backend.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use broker_service::api::{create_router, AppState};
use common::{envelope, listed_room, yanolja_payload, Broker};
use serde_json::{json, Value};
use shared::Platform;
use tower::ServiceExt;
use uuid::Uuid;

fn router(broker: &Broker) -> axum::Router {
    create_router(AppState {
        coordinator: broker.coordinator.clone(),
        engine: broker.engine.clone(),
        failed_events: broker.failed_events.clone(),
    })
}

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, headers, body)
}

fn post_event(body: String, platform: Option<&str>, correlation_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/events")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Event-Type", "BOOKING");
    if let Some(platform) = platform {
        builder = builder.header("X-Platform", platform);
    }
    if let Some(correlation_id) = correlation_id {
        builder = builder.header("X-Correlation-Id", correlation_id);
    }
    builder.body(Body::from(body)).expect("request")
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn accepted_event_echoes_correlation_id() {
    let broker = Broker::new();
    listed_room(&broker.store, &[(Platform::Yanolja, "R-101")]).await;
    let router = router(&broker);
    let body = envelope("evt-100", "YNJ-100", yanolja_payload("YNJ-100", "R-101", "2025-08-15", "2025-08-18"));

    let (status, headers, json) = send(&router, post_event(body, Some("A"), Some("abc12345"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["eventId"], "evt-100");
    assert_eq!(json["status"], "ACCEPTED");
    assert_eq!(headers.get("x-correlation-id").unwrap(), "abc12345");
}

#[tokio::test]
async fn missing_platform_header_is_a_validation_error() {
    let broker = Broker::new();
    let router = router(&broker);
    let body = envelope("evt-101", "YNJ-101", json!({}));

    let (status, headers, json) = send(&router, post_event(body, None, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    let generated = headers.get("x-correlation-id").unwrap().to_str().unwrap();
    assert_eq!(generated.len(), 8);
    assert_eq!(json["traceId"], generated);
    // rejected before ingestion, nothing captured
    assert!(broker.raw.captured().is_empty());
}

#[tokio::test]
async fn unknown_platform_returns_error_body() {
    let broker = Broker::new();
    let router = router(&broker);
    let body = envelope("evt-102", "X-1", json!({ "a": 1 }));

    let (status, _, json) = send(&router, post_event(body, Some("UNKNOWN"), Some("feedbeef"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_PLATFORM");
    assert_eq!(json["details"]["eventId"], "evt-102");
    assert_eq!(json["traceId"], "feedbeef");
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn non_utf8_body_is_a_structured_parse_error() {
    let broker = Broker::new();
    let router = router(&broker);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/events")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Platform", "A")
        .header("X-Event-Type", "BOOKING")
        .header("X-Correlation-Id", "deadbeef")
        .body(Body::from(vec![b'{', 0xff, 0xfe, b'}']))
        .expect("request");

    let (status, headers, json) = send(&router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "EVENT_PARSE_ERROR");
    assert_eq!(json["traceId"], "deadbeef");
    assert_eq!(headers.get("x-correlation-id").unwrap(), "deadbeef");
    assert_eq!(broker.raw.captured()[0].raw_body, "{\u{fffd}\u{fffd}}");
    assert_eq!(broker.failed_events.len(), 1);
}

#[tokio::test]
async fn overlapping_booking_is_a_conflict() {
    let broker = Broker::new();
    listed_room(&broker.store, &[(Platform::Yanolja, "R-101")]).await;
    let router = router(&broker);

    let first = envelope("evt-103", "YNJ-103", yanolja_payload("YNJ-103", "R-101", "2025-08-15", "2025-08-18"));
    let (status, _, _) = send(&router, post_event(first, Some("A"), None)).await;
    assert_eq!(status, StatusCode::OK);

    let second = envelope("evt-104", "YNJ-104", yanolja_payload("YNJ-104", "R-101", "2025-08-17", "2025-08-19"));
    let (status, _, json) = send(&router, post_event(second, Some("A"), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "NOT_AVAILABLE");
    assert_eq!(json["reason"], "NOT_AVAILABLE");
}

#[tokio::test]
async fn failed_events_can_be_listed_and_resolved() {
    let broker = Broker::new();
    let router = router(&broker);
    send(&router, post_event("{broken".to_string(), Some("A"), None)).await;

    let (status, _, json) = send(&router, empty_request(Method::GET, "/api/failed-events?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = json.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["rawPayload"], "{broken");
    assert_eq!(listed[0]["resolved"], false);

    let id = listed[0]["id"].as_str().unwrap().to_string();
    let (status, _, _) = send(&router, empty_request(Method::POST, &format!("/api/failed-events/{id}/resolve"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, _, json) = send(&router, empty_request(Method::GET, "/api/failed-events")).await;
    assert_eq!(json[0]["resolved"], true);

    let missing = Uuid::new_v4();
    let (status, _, _) = send(&router, empty_request(Method::POST, &format!("/api/failed-events/{missing}/resolve"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rooms_can_be_blocked_and_unblocked() {
    let broker = Broker::new();
    let room = listed_room(&broker.store, &[(Platform::Yanolja, "R-101")]).await;
    let router = router(&broker);
    let uri = format!("/api/rooms/{}/blocks", room.id);
    let window = json!({ "checkIn": "2025-09-01", "checkOut": "2025-09-03", "reason": "renovation" });

    let (status, _, json) = send(&router, json_request(Method::POST, &uri, window.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, _, json) = send(&router, json_request(Method::POST, &uri, window.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "NOT_AVAILABLE");

    let (status, _, json) = send(&router, json_request(Method::DELETE, &uri, window)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let backwards = json!({ "checkIn": "2025-09-03", "checkOut": "2025-09-01" });
    let (status, _, json) = send(&router, json_request(Method::POST, &uri, backwards)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let unknown = format!("/api/rooms/{}/blocks", Uuid::new_v4());
    let (status, _, json) = send(
        &router,
        json_request(Method::POST, &unknown, json!({ "checkIn": "2025-09-01", "checkOut": "2025-09-02" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "UNKNOWN_ROOM");
}

#[tokio::test]
async fn health_check_answers_ok() {
    let broker = Broker::new();
    let (status, _, body) = send(&router(&broker), empty_request(Method::GET, "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}
