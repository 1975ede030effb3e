//! Error type definitions for evi operations

use thiserror::Error as ThisError;

/// Primary error type for evi operations
///
/// Every variant carries a static `context` naming the operation that failed
/// and a human-readable `message`. Errors are fail-fast: nothing in the core
/// retries or rolls back.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// Malformed caller input (empty vectors, wrong seed length, bad dimension)
    #[error("[InvalidInput] {context}: {message}")]
    InvalidInput {
        context: &'static str,
        message: String,
    },

    /// Operation not available for the current mode, preset or device
    #[error("[NotSupported] {context}: {message}")]
    NotSupported {
        context: &'static str,
        message: String,
    },

    /// Key material was used before it was generated or loaded
    #[error("[KeyNotLoaded] {context}: {message}")]
    KeyNotLoaded {
        context: &'static str,
        message: String,
    },

    /// Encryption or encoding failed
    #[error("[EncryptionError] {context}: {message}")]
    Encryption {
        context: &'static str,
        message: String,
    },

    /// Ciphertext is structurally invalid or the key is missing
    #[error("[DecryptionError] {context}: {message}")]
    Decryption {
        context: &'static str,
        message: String,
    },

    /// Index beyond container bounds
    #[error("[OutOfRange] {context}: {message}")]
    OutOfRange {
        context: &'static str,
        message: String,
    },

    /// A file could not be opened
    #[error("[FileNotFound] {context}: {message}")]
    FileNotFound {
        context: &'static str,
        message: String,
    },

    /// API used in a way the object does not allow
    #[error("[InvalidAccess] {context}: {message}")]
    InvalidAccess {
        context: &'static str,
        message: String,
    },

    /// Wire data could not be read or written
    #[error("[SerializationError] {context}: {message}")]
    Serialization {
        context: &'static str,
        message: String,
    },
}

/// Discriminant of [`Error`], convenient for assertions and bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotSupported,
    KeyNotLoaded,
    Encryption,
    Decryption,
    OutOfRange,
    FileNotFound,
    InvalidAccess,
    Serialization,
}

/// Result type for evi operations
pub type Result<T> = core::result::Result<T, Error>;

macro_rules! constructors {
    ($($fn_name:ident => $variant:ident),* $(,)?) => {
        impl Error {
            $(
                #[doc = concat!("Build an [`Error::", stringify!($variant), "`]")]
                pub fn $fn_name(context: &'static str, message: impl Into<String>) -> Self {
                    Self::$variant { context, message: message.into() }
                }
            )*
        }
    };
}

constructors! {
    invalid_input => InvalidInput,
    not_supported => NotSupported,
    key_not_loaded => KeyNotLoaded,
    encryption => Encryption,
    decryption => Decryption,
    out_of_range => OutOfRange,
    file_not_found => FileNotFound,
    invalid_access => InvalidAccess,
    serialization => Serialization,
}

impl Error {
    /// Kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::KeyNotLoaded { .. } => ErrorKind::KeyNotLoaded,
            Self::Encryption { .. } => ErrorKind::Encryption,
            Self::Decryption { .. } => ErrorKind::Decryption,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::InvalidAccess { .. } => ErrorKind::InvalidAccess,
            Self::Serialization { .. } => ErrorKind::Serialization,
        }
    }

    fn parts_mut(&mut self) -> (&mut &'static str, &mut String) {
        match self {
            Self::InvalidInput { context, message }
            | Self::NotSupported { context, message }
            | Self::KeyNotLoaded { context, message }
            | Self::Encryption { context, message }
            | Self::Decryption { context, message }
            | Self::OutOfRange { context, message }
            | Self::FileNotFound { context, message }
            | Self::InvalidAccess { context, message }
            | Self::Serialization { context, message } => (context, message),
        }
    }

    /// Message carried by this error
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput { message, .. }
            | Self::NotSupported { message, .. }
            | Self::KeyNotLoaded { message, .. }
            | Self::Encryption { message, .. }
            | Self::Decryption { message, .. }
            | Self::OutOfRange { message, .. }
            | Self::FileNotFound { message, .. }
            | Self::InvalidAccess { message, .. }
            | Self::Serialization { message, .. } => message,
        }
    }

    /// Replace the context of an existing error, keeping its message
    pub fn with_context(mut self, context: &'static str) -> Self {
        *self.parts_mut().0 = context;
        self
    }

    /// Replace the message of an existing error, keeping its context
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        *self.parts_mut().1 = message.into();
        self
    }
}
