//! Traits shared across the evi crates

pub mod serialize;

pub use serialize::{Serialize, SerializeSecret};
