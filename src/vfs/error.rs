//! Error types for virtual filesystem operations
//!
//! Backends produce wildly different error types (OS errors, SDK errors,
//! remote protocol failures). Everything is funneled into [`VfsError`] so the
//! protocol layers can make uniform decisions through the boolean
//! classifiers instead of matching concrete backend types.

use std::fmt;
use std::io;

/// Result type alias for filesystem operations
pub type FsResult<T> = std::result::Result<T, VfsError>;

/// Unified error type for filesystem operations
#[derive(Debug)]
pub enum VfsError {
    /// I/O error from the underlying storage
    Io(io::Error),

    /// Target path does not exist
    NotExist { path: String },

    /// Access denied by the backend
    Permission { path: String, message: String },

    /// Operation not available on this backend
    NotSupported { backend: String, operation: String },

    /// The backend cannot report available storage size
    StorageSizeUnavailable,

    /// Configuration field violates its rules
    Validation(ValidationError),

    /// Credential encryption or decryption failed
    Credential { message: String },

    /// The external metadata store failed
    MetadataPlugin { message: String },

    /// Backend transport failure, propagated verbatim
    Transport { backend: String, message: String },

    /// Generic error with message
    Other(String),
}

impl VfsError {
    /// Check if this error means the target path is absent
    pub fn is_not_exist(&self) -> bool {
        match self {
            VfsError::NotExist { .. } => true,
            VfsError::Io(err) => err.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Check if this error means access was denied
    pub fn is_permission(&self) -> bool {
        match self {
            VfsError::Permission { .. } => true,
            VfsError::Io(err) => err.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Check if this error means the capability is absent on this backend
    pub fn is_not_supported(&self) -> bool {
        matches!(self, VfsError::NotSupported { .. })
    }

    /// Shorthand for an unsupported-operation error
    pub fn unsupported(backend: &str, operation: &str) -> Self {
        VfsError::NotSupported {
            backend: backend.to_string(),
            operation: operation.to_string(),
        }
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::Io(err) => write!(f, "I/O error: {}", err),
            VfsError::NotExist { path } => write!(f, "path does not exist: {}", path),
            VfsError::Permission { path, message } => {
                write!(f, "permission denied for {}: {}", path, message)
            }
            VfsError::NotSupported { backend, operation } => {
                write!(f, "operation {:?} not supported by backend {}", operation, backend)
            }
            VfsError::StorageSizeUnavailable => {
                write!(f, "unable to get available size for this storage backend")
            }
            VfsError::Validation(err) => write!(f, "{}", err),
            VfsError::Credential { message } => write!(f, "credential error: {}", message),
            VfsError::MetadataPlugin { message } => {
                write!(f, "metadata provider error: {}", message)
            }
            VfsError::Transport { backend, message } => {
                write!(f, "transport error on {}: {}", backend, message)
            }
            VfsError::Other(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for VfsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VfsError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for VfsError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => VfsError::NotExist {
                path: String::new(),
            },
            io::ErrorKind::PermissionDenied => VfsError::Permission {
                path: String::new(),
                message: err.to_string(),
            },
            _ => VfsError::Io(err),
        }
    }
}

impl From<ValidationError> for VfsError {
    fn from(err: ValidationError) -> Self {
        VfsError::Validation(err)
    }
}

/// A configuration field violating its rules, with a human-readable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_exist_classifier() {
        let err = VfsError::NotExist {
            path: "/missing".to_string(),
        };
        assert!(err.is_not_exist());
        assert!(!err.is_permission());

        let io_err = VfsError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(io_err.is_not_exist());
    }

    #[test]
    fn test_permission_classifier() {
        let err = VfsError::Permission {
            path: "/secret".to_string(),
            message: "denied".to_string(),
        };
        assert!(err.is_permission());
        assert!(!err.is_not_exist());

        let io_err = VfsError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(io_err.is_permission());
    }

    #[test]
    fn test_not_supported_classifier() {
        let err = VfsError::unsupported("s3fs", "symlink");
        assert!(err.is_not_supported());
        assert!(!err.is_not_exist());
        assert!(err.to_string().contains("symlink"));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: VfsError = io::Error::new(io::ErrorKind::NotFound, "file gone").into();
        assert!(matches!(err, VfsError::NotExist { .. }));

        let err: VfsError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, VfsError::Permission { .. }));

        let err: VfsError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, VfsError::Io(_)));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("bucket cannot be empty");
        assert_eq!(err.to_string(), "bucket cannot be empty");

        let wrapped: VfsError = err.into();
        assert_eq!(wrapped.to_string(), "bucket cannot be empty");
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;

        let err = VfsError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe broken"));
        assert!(err.source().is_some());
        assert!(VfsError::StorageSizeUnavailable.source().is_none());
    }
}
