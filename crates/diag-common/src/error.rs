//! Error types for diagnostic ingestion and query.

use thiserror::Error;

/// Result type alias using DiagError.
pub type DiagResult<T> = Result<T, DiagError>;

/// Primary error type for diagnostic operations.
#[derive(Debug, Error)]
pub enum DiagError {
    // === Ingestion Errors ===
    #[error("Invalid diagnostics filename: {0}")]
    InvalidFilename(String),

    #[error("Missing required field in diagnostic data: {0}")]
    MissingField(String),

    #[error("Array shape mismatch: {0}")]
    ShapeMismatch(String),

    // === Addressing Errors ===
    #[error("Unsupported protocol '{scheme}' for URI: '{uri}'")]
    UnsupportedProtocol { scheme: String, uri: String },

    #[error("Diagnostic file group not found: {0}")]
    GroupNotFound(String),

    #[error("Diagnostic group path exists but is not a group: {0}")]
    GroupPathConflict(String),

    // === Query Errors ===
    #[error("Invalid filter for '{coordinate}': {message}")]
    FilterParseError { coordinate: String, message: String },

    #[error("Unknown coordinate: {0}")]
    UnknownCoordinate(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    // === Persistence Errors ===
    #[error("Failed to write to array store: {0}")]
    StoreWriteFailure(String),

    #[error("Failed to commit relational transaction: {0}")]
    CommitFailure(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    // === Infrastructure Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DiagError {
    /// Create a filter parse error for a coordinate.
    pub fn filter(coordinate: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FilterParseError {
            coordinate: coordinate.into(),
            message: message.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            DiagError::InvalidFilename(_)
            | DiagError::FilterParseError { .. }
            | DiagError::UnknownCoordinate(_)
            | DiagError::InvalidParameter { .. } => 400,

            DiagError::GroupNotFound(_) | DiagError::NotFound(_) => 404,

            _ => 500,
        }
    }

    /// A short client-facing message for this error.
    ///
    /// Server-side failures are not described in detail to clients.
    pub fn client_message(&self) -> String {
        match self {
            DiagError::GroupNotFound(_) => "Diagnostic file group not found".to_string(),
            DiagError::NotFound(_) => "Diagnostic file not found".to_string(),
            DiagError::GroupPathConflict(_) => "Unable to read diagnostic file group".to_string(),
            e if e.http_status_code() == 400 => e.to_string(),
            _ => "Unable to read diagnostic file".to_string(),
        }
    }
}

impl From<std::io::Error> for DiagError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => DiagError::NotFound(err.to_string()),
            _ => DiagError::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DiagError {
    fn from(err: serde_json::Error) -> Self {
        DiagError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(DiagError::GroupNotFound("a/b".into()).http_status_code(), 404);
        assert_eq!(DiagError::GroupPathConflict("a/b".into()).http_status_code(), 500);
        assert_eq!(DiagError::filter("latitude", "bad").http_status_code(), 400);
        assert_eq!(DiagError::StoreWriteFailure("x".into()).http_status_code(), 500);
        assert_eq!(DiagError::CommitFailure("x".into()).http_status_code(), 500);
    }

    #[test]
    fn test_unsupported_protocol_message() {
        let err = DiagError::UnsupportedProtocol {
            scheme: "ftp".into(),
            uri: "ftp://host/diag.zarr".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported protocol 'ftp' for URI: 'ftp://host/diag.zarr'"
        );
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(DiagError::from(io).http_status_code(), 404);
    }

    #[test]
    fn test_client_message_hides_internal_detail() {
        let err = DiagError::StorageError("s3 credentials rejected".into());
        assert_eq!(err.client_message(), "Unable to read diagnostic file");
    }
}
