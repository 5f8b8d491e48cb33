use futures::StreamExt;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Headers};
use rdkafka::Message;
use tracing::{error, warn};

use crate::api::{HEADER_CORRELATION_ID, HEADER_EVENT_ID, HEADER_EVENT_TYPE, HEADER_PLATFORM};
use crate::ingestion::{EventHeaders, IngestionCoordinator, IngestionOutcome};

/// Feeds platform events published to Kafka through the same ingestion path as
/// the HTTP endpoint. The message payload is the raw body and the message
/// headers carry the ingestion headers.
pub struct EventConsumer {
    coordinator: IngestionCoordinator,
}

impl EventConsumer {
    pub fn new(coordinator: IngestionCoordinator) -> Self {
        Self { coordinator }
    }

    pub async fn run(&self, consumer: StreamConsumer) {
        let mut message_stream = consumer.stream();

        while let Some(message) = message_stream.next().await {
            match message {
                Ok(m) => {
                    match m.payload() {
                        Some(body) => {
                            let headers = event_headers(&m);
                            if let IngestionOutcome::Rejected { event_id, code, .. } =
                                self.coordinator.process_bytes(body, &headers).await
                            {
                                warn!(
                                    "Event {} from partition {} offset {} rejected with {}",
                                    event_id,
                                    m.partition(),
                                    m.offset(),
                                    code.as_str()
                                );
                            }
                        }
                        None => warn!("Skipping empty message at offset {}", m.offset()),
                    }
                    // rejected events are already recorded, redelivery would not change the outcome
                    if let Err(e) = consumer.commit_message(&m, CommitMode::Async) {
                        error!("Error committing message: {}", e);
                    }
                }
                Err(e) => error!("Error receiving message: {}", e),
            }
        }
    }
}

fn event_headers(message: &BorrowedMessage<'_>) -> EventHeaders {
    let mut headers = EventHeaders::default();
    let Some(kafka_headers) = message.headers() else {
        return headers;
    };

    for header in kafka_headers.iter() {
        let value = header
            .value
            .and_then(|v| std::str::from_utf8(v).ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        match header.key.to_ascii_lowercase().as_str() {
            HEADER_EVENT_ID => headers.event_id = value,
            HEADER_PLATFORM => headers.platform = value,
            HEADER_EVENT_TYPE => headers.event_type = value,
            HEADER_CORRELATION_ID => headers.correlation_id = value,
            _ => {}
        }
    }
    headers
}
