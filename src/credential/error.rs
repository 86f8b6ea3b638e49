//! Error types for credential acquisition.

use thiserror::Error;

use crate::process::ProcessError;

/// Errors raised while obtaining a Resource Manager token.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CredentialError {
    /// Raised when the Azure CLI cannot be launched.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// Raised when the Azure CLI exits with a non-zero status, typically
    /// because no operator is logged in.
    #[error("{program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed (typically `az`).
        program: String,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when the managed identity endpoint cannot be reached.
    #[error("managed identity request failed: {message}")]
    Request {
        /// Transport error message.
        message: String,
    },
    /// Raised when the managed identity endpoint rejects the request.
    #[error("managed identity endpoint returned {status}: {body}")]
    Endpoint {
        /// HTTP status code.
        status: u16,
        /// Response body returned by the endpoint.
        body: String,
    },
    /// Raised when a token response cannot be parsed.
    #[error("failed to parse {origin} output: {message}")]
    Parse {
        /// Which credential produced the payload.
        origin: String,
        /// Parser error message.
        message: String,
    },
}
