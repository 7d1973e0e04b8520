use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const BODY_EXCERPT_LEN: usize = 200;

/// Error payload returned by the remote API on failed calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// A raw response as handed over by the transport layer, before anything
/// has been decided about what it means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub code: u16,
    pub body: Vec<u8>,
}

/// What the normalizer extracted from a [`TransportResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub code: u16,
    pub detail: Option<String>,
}

impl Normalized {
    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl TransportResponse {
    pub fn new(code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            body: body.into(),
        }
    }

    /// Extract `(code, detail)` from the response.
    ///
    /// A 404 never carries a detail: absence is for the caller to interpret.
    /// Error-indicating codes always carry one, synthesized from the body when
    /// it does not decode to an [`ErrorDetail`].
    pub fn normalize(&self) -> Normalized {
        let code = self.code;
        if code == 404 {
            return Normalized { code, detail: None };
        }

        if let Ok(payload) = serde_json::from_slice::<ErrorDetail>(&self.body) {
            return Normalized {
                code,
                detail: Some(payload.detail),
            };
        }

        if (200..300).contains(&code) {
            return Normalized { code, detail: None };
        }

        Normalized {
            code,
            detail: Some(format!(
                "unexpected response (HTTP {}): {}",
                code,
                self.body_excerpt()
            )),
        }
    }

    /// Decode the body as the expected object type.
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| AppError::MalformedResponse {
            code: self.code,
            reason: format!("failed to decode body: {}", e),
        })
    }

    fn body_excerpt(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return "<empty body>".to_string();
        }
        trimmed.chars().take(BODY_EXCERPT_LEN).collect()
    }
}

/// Interpret a direct (non-polling) call that must return an object.
pub fn expect_ok<T: DeserializeOwned>(response: &TransportResponse, what: &str) -> AppResult<T> {
    let normalized = response.normalize();
    if normalized.is_not_found() {
        return Err(AppError::NotFound(what.to_string()));
    }
    if let Some(detail) = normalized.detail {
        return Err(AppError::Api {
            code: normalized.code,
            detail,
        });
    }
    response.decode()
}

/// Interpret a direct call whose body is irrelevant, e.g. a DELETE.
/// Returns `false` when the target was already gone.
pub fn expect_done(response: &TransportResponse) -> AppResult<bool> {
    let normalized = response.normalize();
    if normalized.is_not_found() {
        return Ok(false);
    }
    match normalized.detail {
        Some(detail) => Err(AppError::Api {
            code: normalized.code,
            detail,
        }),
        None => Ok(true),
    }
}
