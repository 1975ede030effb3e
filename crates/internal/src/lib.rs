//! Internal helpers shared by the evi crates
//!
//! Integer arithmetic used while building parameter tables, fixed-width name
//! fields for key files and constant-time comparison of key material.
//! Nothing here is part of the stable public API.

#![forbid(unsafe_code)]

pub mod constant_time;
pub mod fixed;
pub mod math;
