//! Error type definitions.
//!
//! This module defines every error kind the checker and the pusher can raise.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error connecting to the task queue.
    #[error("Queue connection error: {0}")]
    QueueConnectError(#[from] QueueError),

    /// The worker process was started without a usable configuration.
    #[error("Worker configuration error: {0}")]
    WorkerConfigError(String),

    /// Error writing the pidfile.
    #[error("Pidfile error: {0}")]
    PidfileError(#[from] std::io::Error),
}

/// Rejected configuration values, reported once at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A count or duration that must be greater than zero.
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    /// An option that must hold an absolute URL.
    #[error("{option} is not a valid URL ({value}): {reason}")]
    InvalidUrl {
        option: &'static str,
        value: String,
        reason: String,
    },

    /// An option that must not be blank.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Input and output tube must differ, otherwise results are checked again.
    #[error("input and output tube are both '{0}'")]
    SameTube(String),
}

/// Failure of a single resolver fetch.
///
/// The fetch never yields a partial result: either the whole hop is known or
/// one of these is returned.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// TCP/TLS connection could not be established.
    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    /// Any other transport or protocol failure (bad URL, body read, decode).
    #[error("request to {url} failed: {reason}")]
    Protocol { url: String, reason: String },
}

impl RequestError {
    /// Wraps a `reqwest::Error` raised while fetching `url`.
    pub fn from_reqwest(url: &str, error: ReqwestError) -> Self {
        let url = url.to_string();
        match super::categorize_reqwest_error(&error) {
            RequestErrorKind::Timeout => RequestError::Timeout { url },
            RequestErrorKind::Connect => RequestError::Connect {
                url,
                reason: error.to_string(),
            },
            _ => RequestError::Protocol {
                url,
                reason: error.to_string(),
            },
        }
    }
}

/// Categories of `reqwest` failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestErrorKind {
    Builder,
    Redirect,
    Status,
    Timeout,
    Request,
    Connect,
    Body,
    Decode,
    Other,
}

/// Error types for task queue operations.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The backing store is unreachable or rejected the command.
    #[error("Queue durability error: {0}")]
    Durability(String),

    /// A payload could not be encoded or decoded.
    #[error("Task payload codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The task is not (or no longer) claimed on this tube.
    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        QueueError::Durability(e.to_string())
    }
}
