//! Public API traits and types for the evi library
//!
//! This crate provides the error taxonomy shared by every evi crate, the
//! byte serialization traits and the small enums (evaluation mode, encode
//! type, device, seal mode) that appear in every public signature.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at the crate level for convenience
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use traits::{Serialize, SerializeSecret};
pub use types::*;
