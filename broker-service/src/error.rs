use axum::http::StatusCode;
use serde::Serialize;
use shared::{FailureReason, Platform};
use uuid::Uuid;

/// Error codes exposed to platforms on the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    EventParseError,
    InvalidPlatform,
    TranslatorNotFound,
    PayloadSerializationFailed,
    ProcessingFailed,
    UnknownRoom,
    NotAvailable,
    RoomAlreadyBooked,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::EventParseError => "EVENT_PARSE_ERROR",
            ErrorCode::InvalidPlatform => "INVALID_PLATFORM",
            ErrorCode::TranslatorNotFound => "TRANSLATOR_NOT_FOUND",
            ErrorCode::PayloadSerializationFailed => "PAYLOAD_SERIALIZATION_FAILED",
            ErrorCode::ProcessingFailed => "PROCESSING_FAILED",
            ErrorCode::UnknownRoom => "UNKNOWN_ROOM",
            ErrorCode::NotAvailable => "NOT_AVAILABLE",
            ErrorCode::RoomAlreadyBooked => "ROOM_ALREADY_BOOKED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError
            | ErrorCode::EventParseError
            | ErrorCode::InvalidPlatform
            | ErrorCode::PayloadSerializationFailed
            | ErrorCode::UnknownRoom => StatusCode::BAD_REQUEST,
            ErrorCode::NotAvailable | ErrorCode::RoomAlreadyBooked => StatusCode::CONFLICT,
            ErrorCode::TranslatorNotFound
            | ErrorCode::ProcessingFailed
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn default_reason(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "request validation failed",
            ErrorCode::EventParseError => "event could not be parsed",
            ErrorCode::InvalidPlatform => "platform is not supported",
            ErrorCode::TranslatorNotFound => "no translator registered for platform",
            ErrorCode::PayloadSerializationFailed => "payload could not be serialized",
            ErrorCode::ProcessingFailed => "event processing failed",
            ErrorCode::UnknownRoom => "no room is mapped to the platform room id",
            ErrorCode::NotAvailable => "room is not available for the requested dates",
            ErrorCode::RoomAlreadyBooked => "reservation already holds a different booking",
            ErrorCode::InternalError => "internal server error",
        }
    }
}

impl From<FailureReason> for ErrorCode {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::UnknownRoom => ErrorCode::UnknownRoom,
            FailureReason::NotAvailable => ErrorCode::NotAvailable,
            FailureReason::RoomAlreadyBooked => ErrorCode::RoomAlreadyBooked,
        }
    }
}

/// Failures of the persistence collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("stored row is not readable: {0}")]
    Corrupt(String),

    #[error("store is unavailable: {0}")]
    Unavailable(String),
}

impl From<shared::UnknownVariant> for StoreError {
    fn from(err: shared::UnknownVariant) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Failures of administrative inventory operations.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("rejected: {0}")]
    Rejected(FailureReason),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProcessingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProcessingError::Rejected(reason) => ErrorCode::from(*reason),
            ProcessingError::Store(_) => ErrorCode::InternalError,
        }
    }
}

/// Rejections raised while registering properties, rooms and listings.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("property {0} does not exist")]
    UnknownProperty(Uuid),

    #[error("room {0} does not exist")]
    UnknownRoom(Uuid),

    #[error("{platform} room id `{platform_room_id}` is already listed")]
    DuplicateListing {
        platform: Platform,
        platform_room_id: String,
    },

    #[error("room {room_id} already has a {platform} listing")]
    RoomAlreadyListed { room_id: Uuid, platform: Platform },

    #[error(transparent)]
    Store(#[from] StoreError),
}
