//! Error types for the festival schedule engine.

use crate::calendar::FestivalDay;

/// A clock string that does not match the `h:mm AM/PM` shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The text is not exactly a time token followed by a marker.
    #[error("expected \"h:mm AM/PM\", got {0:?}")]
    Shape(String),

    /// The marker is neither `AM` nor `PM`.
    #[error("unknown day-period marker {marker:?} in {text:?}")]
    Marker { text: String, marker: String },

    /// Hour or minute is not a number or is out of range.
    #[error("time out of range in {0:?}")]
    Range(String),
}

/// The notification platform rejected a schedule or cancel request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dispatch error: {0}")]
pub struct DispatchError(pub String);

/// The key-value store could not read or write a value.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Backend read failed.
    #[error("cannot read {key}: {message}")]
    Read { key: String, message: String },

    /// Backend write failed.
    #[error("cannot write {key}: {message}")]
    Write { key: String, message: String },

    /// A stored value could not be encoded or decoded.
    #[error("cannot encode {key}: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error type for the festival engine.
#[derive(Debug, thiserror::Error)]
pub enum FestivalError {
    /// Malformed clock string.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Notification dispatcher failure.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Store read/write failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Day label with no date in the festival calendar.
    #[error("calendar has no date for {0}")]
    Calendar(FestivalDay),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Rejected settings values.
    #[error("settings error: {0}")]
    Settings(String),

    /// Lineup data could not be loaded.
    #[error("lineup error: {0}")]
    Lineup(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host command with a missing or malformed payload.
    #[error("invalid command: {0}")]
    Command(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, FestivalError>;
