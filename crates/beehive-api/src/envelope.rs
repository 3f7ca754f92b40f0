use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ApiError;

const STATUS_OK: &str = "ok";

/// `{status: "ok" | ..., data?, error?, description?}`
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_OK)
    }
}

pub(crate) fn decode_success<T: DeserializeOwned>(
    http_status: u16,
    body: &str,
) -> Result<Option<T>, ApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let envelope: ApiEnvelope<T> = serde_json::from_str(body)
        .map_err(|error| ApiError::Decode(format!("{error}: {}", truncate_for_error(body))))?;
    if !envelope.is_ok() {
        return Err(ApiError::Status {
            status: http_status,
            error: envelope.error.or(Some(envelope.status)),
            description: envelope.description,
        });
    }
    Ok(envelope.data)
}

/// Builds the structured failure for a non-2xx response, keeping whatever
/// error code the body carries.
pub(crate) fn decode_failure(http_status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body) {
        Ok(envelope) => ApiError::Status {
            status: http_status,
            error: envelope.error,
            description: envelope.description,
        },
        Err(_) => ApiError::Status {
            status: http_status,
            error: None,
            description: Some(truncate_for_error(body)).filter(|value| !value.is_empty()),
        },
    }
}

fn truncate_for_error(body: &str) -> String {
    const MAX_LEN: usize = 200;
    if body.chars().count() <= MAX_LEN {
        body.trim().to_owned()
    } else {
        format!("{}...", body.chars().take(MAX_LEN).collect::<String>())
    }
}
