//! Tracing setup shared by the alerts binaries and test suites.

pub mod tracing;

pub use crate::tracing::init_test_tracing;
