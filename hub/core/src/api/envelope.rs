//! Response envelope decoding

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ApiError;

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Decode an API reply body into its `data` payload
///
/// A non-empty `error` field wins over `data`. A missing `data` field is
/// decoded as JSON `null`, so callers expecting `()` or `Option<_>` accept
/// it.
///
/// # Errors
///
/// [`ApiError::Remote`] for error envelopes, [`ApiError::InvalidResponse`]
/// when the body is not an envelope or `data` has the wrong shape.
pub fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| ApiError::InvalidResponse(format!("{e}: {}", truncate(body))))?;

    if let Some(error) = envelope.error.filter(|e| !e.is_empty()) {
        return Err(ApiError::Remote(error));
    }

    let data = envelope.data.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(data).map_err(|e| ApiError::InvalidResponse(format!("data: {e}")))
}

fn truncate(body: &str) -> &str {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
