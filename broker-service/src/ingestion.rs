//! Ingestion coordinator: raw capture, envelope parsing, translator dispatch
//! and processing, in that order, for every inbound body.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{EventKind, FailedEvent, Platform};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::processing::ReservationEngine;
use crate::store::{FailedEventSink, RawStore};
use crate::translator::TranslatorRegistry;

/// Transport-level metadata sent alongside a body, as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeaders {
    pub event_id: Option<String>,
    pub platform: Option<String>,
    pub event_type: Option<String>,
    pub correlation_id: Option<String>,
}

/// Envelope every platform wraps its payload in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingEventRequest {
    pub event_id: Option<String>,
    pub reservation_id: Option<String>,
    pub payload: Option<Value>,
}

/// What is known about an event while it moves through ingestion. Carried
/// explicitly so every log line can name the event it belongs to.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    pub event_id: String,
    pub correlation_id: String,
    pub platform: Option<Platform>,
    pub platform_header: String,
    pub kind: EventKind,
    pub reservation_id: String,
}

impl IngestionContext {
    fn platform_label(&self) -> &str {
        match self.platform {
            Some(platform) => platform.as_str(),
            None => self.platform_header.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome {
    Accepted {
        event_id: String,
    },
    Rejected {
        event_id: String,
        code: ErrorCode,
        reason: String,
    },
}

impl IngestionOutcome {
    pub fn event_id(&self) -> &str {
        match self {
            IngestionOutcome::Accepted { event_id } => event_id,
            IngestionOutcome::Rejected { event_id, .. } => event_id,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestionOutcome::Accepted { .. })
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            IngestionOutcome::Accepted { .. } => None,
            IngestionOutcome::Rejected { code, .. } => Some(*code),
        }
    }
}

pub fn new_correlation_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Clone)]
pub struct IngestionCoordinator {
    raw_store: Arc<dyn RawStore>,
    registry: TranslatorRegistry,
    engine: ReservationEngine,
    failed_events: Arc<dyn FailedEventSink>,
}

impl IngestionCoordinator {
    pub fn new(
        raw_store: Arc<dyn RawStore>,
        registry: TranslatorRegistry,
        engine: ReservationEngine,
        failed_events: Arc<dyn FailedEventSink>,
    ) -> Self {
        Self {
            raw_store,
            registry,
            engine,
            failed_events,
        }
    }

    /// Ingests a body as it came off the wire. A body that is not UTF-8 is
    /// captured lossily and rejected as unparseable.
    pub async fn process_bytes(&self, raw_body: &[u8], headers: &EventHeaders) -> IngestionOutcome {
        match std::str::from_utf8(raw_body) {
            Ok(text) => self.process(text, headers).await,
            Err(e) => {
                let lossy = String::from_utf8_lossy(raw_body);
                self.run(&lossy, Some(format!("request body is not valid UTF-8: {e}")), headers)
                    .await
            }
        }
    }

    pub async fn process(&self, raw_body: &str, headers: &EventHeaders) -> IngestionOutcome {
        self.run(raw_body, None, headers).await
    }

    async fn run(&self, raw_body: &str, unreadable: Option<String>, headers: &EventHeaders) -> IngestionOutcome {
        // captured before anything can fail; a capture error never stops ingestion
        if let Err(e) = self.raw_store.store(raw_body, headers).await {
            error!(error = %e, "raw event capture failed");
        }

        let parsed = match unreadable {
            Some(reason) => Err(reason),
            None => serde_json::from_str::<IncomingEventRequest>(raw_body)
                .map_err(|e| format!("invalid request body: {e}")),
        };
        let body = parsed.as_ref().ok();
        let ctx = IngestionContext {
            event_id: resolve_event_id(
                headers.event_id.as_deref(),
                body.and_then(|r| r.event_id.as_deref()),
            ),
            correlation_id: non_blank(headers.correlation_id.as_deref())
                .map(str::to_string)
                .unwrap_or_else(new_correlation_id),
            platform: headers.platform.as_deref().and_then(Platform::from_header),
            platform_header: headers.platform.clone().unwrap_or_default(),
            kind: EventKind::from_header(headers.event_type.as_deref()),
            reservation_id: body
                .and_then(|r| r.reservation_id.clone())
                .unwrap_or_default(),
        };

        info!(
            event_id = %ctx.event_id,
            correlation_id = %ctx.correlation_id,
            platform = %ctx.platform_label(),
            event_kind = %ctx.kind,
            "ingesting event"
        );

        let outcome = match parsed {
            Ok(request) => self.ingest(&ctx, raw_body, request).await,
            Err(reason) => {
                self.reject_uncanonical(&ctx, raw_body, ErrorCode::EventParseError, reason)
                    .await
            }
        };

        match &outcome {
            IngestionOutcome::Accepted { .. } => info!(
                event_id = %ctx.event_id,
                correlation_id = %ctx.correlation_id,
                platform = %ctx.platform_label(),
                event_kind = %ctx.kind,
                "event accepted"
            ),
            IngestionOutcome::Rejected { code, reason, .. } => warn!(
                event_id = %ctx.event_id,
                correlation_id = %ctx.correlation_id,
                platform = %ctx.platform_label(),
                event_kind = %ctx.kind,
                code = code.as_str(),
                reason = %reason,
                "event rejected"
            ),
        }
        outcome
    }

    async fn ingest(&self, ctx: &IngestionContext, raw_body: &str, request: IncomingEventRequest) -> IngestionOutcome {
        let Some(platform) = ctx.platform else {
            let reason = format!("unknown platform: {}", ctx.platform_header);
            return self
                .reject_uncanonical(ctx, raw_body, ErrorCode::InvalidPlatform, reason)
                .await;
        };

        let Some(translator) = self.registry.get(platform) else {
            let reason = format!("no translator for platform: {platform}");
            return self
                .reject_uncanonical(ctx, raw_body, ErrorCode::TranslatorNotFound, reason)
                .await;
        };

        let Some(payload) = request.payload else {
            return self
                .reject_uncanonical(ctx, raw_body, ErrorCode::EventParseError, "request has no payload".to_string())
                .await;
        };

        let payload_text = match serde_json::to_string(&payload) {
            Ok(text) => text,
            Err(e) => {
                let reason = format!("payload could not be serialized: {e}");
                return self
                    .reject_uncanonical(ctx, raw_body, ErrorCode::PayloadSerializationFailed, reason)
                    .await;
            }
        };

        let event = match translator.translate(&payload_text, ctx.kind) {
            Ok(event) => event,
            Err(e) => {
                return self
                    .reject_uncanonical(ctx, raw_body, ErrorCode::EventParseError, e.to_string())
                    .await;
            }
        };

        match self.engine.process(&event).await {
            Ok(outcome) if outcome.success => IngestionOutcome::Accepted {
                event_id: ctx.event_id.clone(),
            },
            // already recorded on the audit record, not a failed event
            Ok(outcome) => {
                let (code, reason) = match outcome.failure_reason {
                    Some(reason) => (ErrorCode::from(reason), reason.as_str().to_string()),
                    None => (ErrorCode::ProcessingFailed, "processing failed".to_string()),
                };
                IngestionOutcome::Rejected {
                    event_id: ctx.event_id.clone(),
                    code,
                    reason,
                }
            }
            Err(e) => {
                error!(
                    event_id = %ctx.event_id,
                    correlation_id = %ctx.correlation_id,
                    canonical_event_id = %event.event_id,
                    error = %e,
                    "processing failed, unit of work rolled back"
                );
                IngestionOutcome::Rejected {
                    event_id: ctx.event_id.clone(),
                    code: ErrorCode::InternalError,
                    reason: ErrorCode::InternalError.default_reason().to_string(),
                }
            }
        }
    }

    /// Records a failed event for a body that never became a canonical event.
    async fn reject_uncanonical(
        &self,
        ctx: &IngestionContext,
        raw_body: &str,
        code: ErrorCode,
        reason: String,
    ) -> IngestionOutcome {
        let failed = FailedEvent::new(
            ctx.event_id.as_str(),
            ctx.platform_label(),
            ctx.kind.as_str(),
            ctx.correlation_id.as_str(),
            ctx.reservation_id.as_str(),
            raw_body,
            reason.as_str(),
        );
        if let Err(e) = self.failed_events.save(failed).await {
            error!(event_id = %ctx.event_id, error = %e, "failed event could not be recorded");
        }

        IngestionOutcome::Rejected {
            event_id: ctx.event_id.clone(),
            code,
            reason,
        }
    }
}

fn resolve_event_id(header: Option<&str>, body: Option<&str>) -> String {
    non_blank(header)
        .or(non_blank(body))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_event_id_wins() {
        assert_eq!(resolve_event_id(Some("hdr"), Some("body")), "hdr");
        assert_eq!(resolve_event_id(Some("  "), Some("body")), "body");
        assert_eq!(resolve_event_id(None, Some("")).len(), 36);
    }

    #[test]
    fn correlation_ids_are_short() {
        let id = new_correlation_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
