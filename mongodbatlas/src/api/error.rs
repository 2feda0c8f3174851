use thiserror::Error;

use super::common::AtlasErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("{method} {path}: HTTP {status} ({}) {message}", .error_code.as_deref().unwrap_or("UNKNOWN"))]
    ApiError {
        method: String,
        path: String,
        status: u16,
        error_code: Option<String>,
        message: String,
        #[source]
        details: Option<Box<AtlasErrorResponse>>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            ApiError::RequestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            ApiError::ApiError { error_code, .. } => error_code.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
