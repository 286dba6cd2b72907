//! Error types for the relay.
//!
//! None of these ever reach the sending client: wire and delivery errors are
//! logged and the frame (or the single delivery) is dropped.

use thiserror::Error;

use crate::registry::ConnectionId;

pub type WireResult<T> = Result<T, WireError>;

/// A frame that could not be turned into an inbound event.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("undecodable frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("non-text frame")]
    NotText,

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("missing `{0}`")]
    Missing(&'static str),

    #[error("malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },
}

/// A single recipient could not be handed an outbound event.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error("outbox of connection {0} is closed")]
    Closed(ConnectionId),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} did not resolve to any address")]
    NoAddress(String),
}
