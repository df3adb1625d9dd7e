//! Error types for ImageVault
//!
//! This module defines the common error taxonomy used throughout the system.
//! The transfer layer maps these onto gRPC status codes.

use thiserror::Error;

/// Common result type for ImageVault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for ImageVault
#[derive(Debug, Error)]
pub enum Error {
    // Storage errors
    #[error("disk I/O error: {0}")]
    DiskIo(#[from] std::io::Error),

    #[error("image not found: {filename}")]
    ImageNotFound { filename: String },

    #[error("image is too large: {size} > {max_size}")]
    ImageTooLarge { size: usize, max_size: usize },

    // Metadata repository errors
    #[error("no metadata row for filename: {filename}")]
    RecordNotFound { filename: String },

    #[error("repository error: {0}")]
    Repository(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a repository error
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Check if this is a not found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ImageNotFound { .. } | Self::RecordNotFound { .. }
        )
    }
}
