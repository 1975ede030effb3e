//! Numeric primitives for the evi encryption pipeline
//!
//! This crate holds everything below the scheme layer:
//!
//! - [`arith`]: Shoup and Barrett modular arithmetic on 64-bit residues
//! - [`preset`]: derived constants for each parameter preset
//! - [`ntt`]: negacyclic number theoretic transform, including the padded
//!   and sparse variants used by rank-minimizing packing
//! - [`xof`]: SHAKE256 stream
//! - [`sampler`]: seeded uniform, ternary, fixed-weight and binomial sampling
//!
//! All operations are synchronous and allocation-light. Tables are built once
//! per transform and are read-only afterwards, so an [`Ntt`] can be shared
//! across threads by reference.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// Error module and re-exports
pub mod error;
pub use error::{validate, Error, Result, ResultExt};

pub mod arith;
pub use arith::Modulus;

pub mod preset;
pub use preset::{preset_constants, PresetConstants};

pub mod ntt;
pub use ntt::{Ntt, OutputModFactor};

pub mod xof;
pub use xof::{ExtendableOutputFunction, ShakeXof256};

pub mod sampler;
pub use sampler::RandomSampler;
