//! Fixtures and helpers shared by the evi integration tests and benchmarks
pub mod fixtures;
pub mod vectors;

pub use fixtures::{Fixture, Session};
pub use vectors::{error_stats, ErrorStats, VectorSource};
