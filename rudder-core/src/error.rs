//! Error payloads returned by the backing store.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error response from the backing store.
///
/// `code` follows HTTP conventions; `reason` is a short machine token. The
/// runtime only ever inspects the two benign kinds (`NotFound`, `Conflict`),
/// everything else is treated as transient.
#[derive(Error, Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[error("{message}: {reason}")]
pub struct ErrorResponse {
    /// The status
    pub status: String,
    /// A message about the error
    #[serde(default)]
    pub message: String,
    /// The reason for the error
    #[serde(default)]
    pub reason: String,
    /// The error code
    pub code: u16,
}

impl ErrorResponse {
    /// Payload for an object that does not exist (or no longer exists).
    pub fn not_found(kind: &str, name: &str) -> Self {
        Self {
            status: "Failure".into(),
            message: format!("{kind} {name:?} not found"),
            reason: "NotFound".into(),
            code: 404,
        }
    }

    /// Payload for a resource-version mismatch on write.
    pub fn conflict(kind: &str, name: &str) -> Self {
        Self {
            status: "Failure".into(),
            message: format!(
                "operation cannot be fulfilled on {kind} {name:?}: the object has been modified, apply your changes to the latest version and retry"
            ),
            reason: "Conflict".into(),
            code: 409,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }

    pub fn is_conflict(&self) -> bool {
        self.code == 409
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorResponse;

    #[test]
    fn constructors_set_the_discriminating_code() {
        assert!(ErrorResponse::not_found("Pod", "p").is_not_found());
        assert!(!ErrorResponse::not_found("Pod", "p").is_conflict());
        assert!(ErrorResponse::conflict("Pod", "p").is_conflict());
    }

    #[test]
    fn deserializes_from_a_store_payload() {
        let err: ErrorResponse = serde_json::from_str(
            r#"{"status":"Failure","message":"gone","reason":"NotFound","code":404}"#,
        )
        .unwrap();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "gone: NotFound");
    }
}
