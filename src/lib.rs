//! # evi
//!
//! Encrypted vector similarity search on a CKKS-style RLWE scheme.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! evi = "0.3"
//! ```
//!
//! ## Features
//!
//! - `scheme` (default): contexts, packing, keys and wire formats
//! - `serde`: serde support for the shared enums
//! - `full`: all features enabled
//!
//! ## Crate Structure
//!
//! This is a facade crate that re-exports functionality from several sub-crates:
//!
//! - `evi-params`: degree, context limits and parameter presets
//! - `evi-internal`: integer and wire helpers
//! - `evi-api`: error taxonomy, serialization traits and shared enums
//! - `evi-algorithms`: modular arithmetic, NTT, SHAKE256 and sampling
//! - `evi-scheme`: RNS context, encryptor, decryptor, key generation and
//!   key files

#![forbid(unsafe_code)]

// Core re-exports (always available)
pub use evi_algorithms as algorithms;
pub use evi_api as api;
pub use evi_internal as internal;
pub use evi_params as params;

// Wrapper type returned by `SerializeSecret::to_bytes_zeroizing`
pub use zeroize;

// Feature-gated re-exports
#[cfg(feature = "scheme")]
pub use evi_scheme as scheme;

/// Common imports for evi users
pub mod prelude {
    // Error types
    pub use crate::api::{Error, ErrorKind, Result, ResultExt};

    // Serialization traits
    pub use crate::api::{Serialize, SerializeSecret};

    // Shared enums
    pub use crate::api::{DataType, DeviceType, EncodeType, EvalMode, SealMode};
    pub use crate::params::{Preset, DEGREE};

    #[cfg(feature = "scheme")]
    pub use crate::scheme::{
        BlockAccess, CkksEngine, Context, ContextConfig, Decryptor, Encryptor, KeyGenerator, KeyPack,
        MultiSecretKey, Query, SealInfo, SearchResult, SecretKey,
    };
}
