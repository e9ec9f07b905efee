//! StatusHub HTTP API
//!
//! Every API call is a `POST /api/<name>` with a JSON body. Replies are
//! wrapped in an envelope: `{"data": ...}` on success, `{"error": "..."}` on
//! failure. Authentication is a session cookie obtained from `POST /login`.

mod client;
mod envelope;

use thiserror::Error;

pub use client::HubClient;
pub use envelope::decode_envelope;

/// Errors from talking to the StatusHub API
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server URL could not be parsed or joined
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request did not complete (connection, timeout, body read)
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with an error envelope
    #[error("remote error: {0}")]
    Remote(String),

    /// The reply was not a valid envelope or had the wrong data shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The server rejected the password
    #[error("login failed")]
    LoginFailed,
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}
