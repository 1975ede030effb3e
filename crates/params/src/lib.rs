//! Constant values for evi homomorphic operations
//!
//! This crate holds the fixed polynomial degree, sampler sizes, context
//! limits and the table of named parameter presets. It has no dependencies
//! and never allocates.

#![no_std]

pub mod constants;
pub mod presets;

pub use constants::*;
pub use presets::{Preset, PresetParams, IP0, IP1, QF0};
