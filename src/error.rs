use thiserror::Error;

pub const VALIDATION_MESSAGE: &str = "Please enter a prompt or select a preset";

/// Failure of a single `generate()` call.
///
/// The `Display` output of every variant is exactly the message the view
/// shows in its error slot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    /// Neither a prompt nor a preset was provided. Raised before any request.
    #[error("{}", VALIDATION_MESSAGE)]
    Validation,

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The request never produced a response (connection refused, reset, ...).
    #[error("{0}")]
    Transport(String),
}

impl GenerateError {
    /// Builds a `Backend` error from a non-success response body, preferring
    /// the JSON `detail` field and falling back to the status code.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|value| match value.get("detail") {
                Some(serde_json::Value::String(detail)) if !detail.is_empty() => {
                    Some(detail.clone())
                }
                _ => None,
            })
            .unwrap_or_else(|| format!("HTTP error! status: {}", status));

        GenerateError::Backend { status, message }
    }
}

/// Preset listing could not be fetched. Logged only, never shown.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("preset request failed: {0}")]
    Transport(String),

    #[error("preset listing returned status {0}")]
    Status(u16),

    #[error("preset listing was not valid JSON: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_field_becomes_the_message() {
        let err = GenerateError::from_response(400, br#"{"detail":"bad prompt"}"#);
        assert_eq!(err.to_string(), "bad prompt");
    }

    #[test]
    fn unparsable_body_falls_back_to_status() {
        let err = GenerateError::from_response(500, b"<html>Internal Server Error</html>");
        assert_eq!(err.to_string(), "HTTP error! status: 500");
        assert!(matches!(err, GenerateError::Backend { status: 500, .. }));
    }

    #[test]
    fn json_without_detail_falls_back_to_status() {
        let err = GenerateError::from_response(422, br#"{"error":"nope"}"#);
        assert_eq!(err.to_string(), "HTTP error! status: 422");
    }

    #[test]
    fn validation_message_is_fixed() {
        assert_eq!(
            GenerateError::Validation.to_string(),
            "Please enter a prompt or select a preset"
        );
    }
}
