//! Error handling for the evi ecosystem

pub mod traits;
pub mod types;

// Re-export the primary error type and result
pub use types::{Error, ErrorKind, Result};

// Re-export error traits
pub use traits::ResultExt;

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            return Self::FileNotFound {
                context: "I/O operation",
                message: e.to_string(),
            };
        }
        Self::Serialization {
            context: "I/O operation",
            message: e.to_string(),
        }
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(_: std::array::TryFromSliceError) -> Self {
        Self::OutOfRange {
            context: "array conversion",
            message: String::from("slice has the wrong length"),
        }
    }
}

/// Specialized result aliases
pub type EncryptResult<T> = Result<T>;
pub type DecryptResult<T> = Result<T>;
pub type KeyResult<T> = Result<T>;
