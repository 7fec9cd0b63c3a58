//! Error types for normalization and execution.

use thiserror::Error;

/// Errors produced while turning API description text into a normalized spec.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The text is neither valid JSON nor valid YAML for the document model.
    #[error("{0}")]
    Parse(String),

    /// The text parsed but is not a usable OpenAPI document.
    #[error("Invalid OpenAPI document: {0}")]
    Invalid(String),
}

/// Errors that stop a tool call before any request is sent.
///
/// Transport failures and timeouts are not errors: they come back as an
/// `ExecutionResult` with status 0.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Required call fields are missing. The caller has to fix its input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The target host is on the private/internal blocklist.
    #[error("Blocked request to private or internal host '{host}'")]
    Blocked {
        /// Host as it appeared in the URL.
        host: String,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl ExecuteError {
    /// HTTP status a boundary layer should answer with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Blocked { .. } => 403,
            Self::Client(_) => 500,
        }
    }
}
