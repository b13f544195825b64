//! Error types for sharetext.
//!
//! Failures are split by granularity:
//!
//! - Container-level failures (`CorruptContainer`, `UnsupportedFormat`, I/O) always
//!   propagate to the caller with the original cause attached via `#[source]`.
//! - Element-level failures (one slide, one image, one formula) are never errors.
//!   Decoders log them with `tracing::debug!` and keep going with an empty or
//!   best-effort element.
//!
//! # Example
//!
//! ```rust
//! use sharetext::{Result, SharetextError};
//!
//! fn first_byte(bytes: &[u8]) -> Result<u8> {
//!     bytes
//!         .first()
//!         .copied()
//!         .ok_or_else(|| SharetextError::corrupt_container("empty container"))
//! }
//! ```
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using `SharetextError`.
pub type Result<T> = std::result::Result<T, SharetextError>;

/// Main error type for all sharetext operations.
#[derive(Debug, Error)]
pub enum SharetextError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt container: {message}")]
    CorruptContainer {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<calamine::Error> for SharetextError {
    fn from(err: calamine::Error) -> Self {
        SharetextError::CorruptContainer {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<zip::result::ZipError> for SharetextError {
    fn from(err: zip::result::ZipError) -> Self {
        SharetextError::CorruptContainer {
            message: format!("Failed to open ZIP package: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<lopdf::Error> for SharetextError {
    fn from(err: lopdf::Error) -> Self {
        SharetextError::CorruptContainer {
            message: format!("Failed to load PDF: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for SharetextError {
    fn from(err: serde_json::Error) -> Self {
        SharetextError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        paste::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl SharetextError {
    error_constructor!(corrupt_container, CorruptContainer);
    error_constructor!(validation, Validation);

    /// True for errors the caller can handle by skipping the document.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, SharetextError::UnsupportedFormat(_))
    }
}
