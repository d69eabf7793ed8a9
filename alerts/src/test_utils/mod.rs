//! Doubles and helpers for tests, enabled with the `test-utils` feature.

pub mod badge;
pub mod clock;
pub mod notify;
pub mod push;
pub mod realtime;
