//! Status mapping and body decoding shared by all endpoints.

use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Reads the status and full body of a response.
pub(crate) async fn read_body(response: reqwest::Response) -> Result<(u16, String), ApiError> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok((status, body))
}

/// Returns `true` for 2xx statuses.
pub(crate) fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Returns `true` if a success body carries no value.
///
/// The service answers lookups of unknown ids with `200` and an empty or
/// `null` body instead of `404`.
pub(crate) fn is_empty_body(body: &str) -> bool {
    let body = body.trim();
    body.is_empty() || body == "null"
}

/// Maps a non-success read response.
pub(crate) fn read_error(status: u16, body: String, resource: &str) -> ApiError {
    match status {
        404 => ApiError::not_found(resource),
        _ => ApiError::http(status, message_or_status(status, body)),
    }
}

/// Maps a non-success write response.
pub(crate) fn write_error(status: u16, body: String, resource: &str) -> ApiError {
    match status {
        404 => ApiError::not_found(resource),
        400..=499 => ApiError::rejected(status, message_or_status(status, body)),
        _ => ApiError::http(status, message_or_status(status, body)),
    }
}

/// Decodes a JSON body, keeping the raw text on failure.
pub(crate) fn decode_json<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, ApiError> {
    serde_json::from_str(body)
        .map_err(|e| ApiError::parse_with_body(format!("Failed to parse {}: {}", what, e), body))
}

fn message_or_status(status: u16, body: String) -> String {
    if body.trim().is_empty() {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown status")
            .to_string()
    } else {
        body
    }
}
