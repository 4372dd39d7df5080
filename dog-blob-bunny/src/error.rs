use thiserror::Error;

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur during blob operations.
///
/// Callers of a [`StorageService`](crate::StorageService) only ever see the coarse
/// `Integrity`, `FileNotFound`, `Unsupported` and (for `exists`) backend variants.
/// The remaining variants are produced by [`BlobStore`](crate::BlobStore) implementations.
#[derive(Error, Debug)]
pub enum BlobError {
    /// Upload failed for any reason (network, checksum mismatch, auth, ...)
    #[error("Upload integrity check failed for key: {key}")]
    Integrity { key: String },

    /// Download failed for any reason, including the object being absent
    #[error("File not found: {key}")]
    FileNotFound { key: String },

    #[error("Blob not found: {id}")]
    NotFound { id: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Operation not supported by this service")]
    Unsupported,

    #[error("Storage backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an upload integrity error
    pub fn integrity<S: Into<String>>(key: S) -> Self {
        Self::Integrity { key: key.into() }
    }

    /// Create a download failure error
    pub fn file_not_found<S: Into<String>>(key: S) -> Self {
        Self::FileNotFound { key: key.into() }
    }

    /// Create an error for an unexpected HTTP status
    pub fn status<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// True for backend errors that mean the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Status { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(BlobError::not_found("a/b.png").is_not_found());
        assert!(BlobError::status(404, "Object Not Found").is_not_found());
        assert!(!BlobError::status(401, "Unauthorized").is_not_found());
        assert!(!BlobError::file_not_found("a/b.png").is_not_found());
    }

    #[test]
    fn test_messages_name_the_key() {
        assert_eq!(
            BlobError::integrity("a/b.png").to_string(),
            "Upload integrity check failed for key: a/b.png"
        );
        assert_eq!(BlobError::file_not_found("x").to_string(), "File not found: x");
    }
}
