//! Error types for the Azure compute backend.

use serde::Deserialize;
use thiserror::Error;

use crate::credential::CredentialError;

/// Errors raised by the Azure compute backend.
///
/// Handlers treat every variant the same way; the distinction exists for
/// logs.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AzureBackendError {
    /// Raised when no token could be obtained.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),
    /// Raised when the request never produced an HTTP response.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// URL that was requested.
        url: String,
        /// Transport error message.
        message: String,
    },
    /// Raised when Resource Manager rejects a request.
    #[error("provider returned {status} ({code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Resource Manager error code (for example `ResourceNotFound`).
        code: String,
        /// Resource Manager error message.
        message: String,
    },
    /// Raised when a long-running operation ends unsuccessfully.
    #[error("{operation} on virtual machine {vm_name} ended as {status}: {message}")]
    OperationFailed {
        /// Operation being waited on.
        operation: String,
        /// Target VM name.
        vm_name: String,
        /// Terminal status reported by the provider.
        status: String,
        /// Provider error message, if any.
        message: String,
    },
    /// Raised when a long-running operation exceeds the wait timeout.
    #[error("timeout waiting for {operation} on virtual machine {vm_name}")]
    Timeout {
        /// Operation being waited on.
        operation: String,
        /// Target VM name.
        vm_name: String,
    },
    /// Raised when a response body cannot be decoded.
    #[error("failed to decode {what}: {message}")]
    Decode {
        /// Payload being decoded.
        what: String,
        /// Parser error message.
        message: String,
    },
}

impl AzureBackendError {
    pub(super) fn transport(url: &str, err: &reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_owned(),
            message: err.to_string(),
        }
    }

    /// Builds an [`AzureBackendError::Api`] from a Resource Manager error
    /// envelope, falling back to the raw body when it is not one.
    pub(super) fn from_response_body(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error);
        match detail {
            Some(detail) => Self::Api {
                status,
                code: detail.code.unwrap_or_else(|| String::from("Unknown")),
                message: detail.message.unwrap_or_default(),
            },
            None => Self::Api {
                status,
                code: String::from("Unknown"),
                message: body.trim().to_owned(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelope {
    #[serde(default)]
    pub(super) error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetail {
    #[serde(default)]
    pub(super) code: Option<String>,
    #[serde(default)]
    pub(super) message: Option<String>,
}
