//! Core of the alerts platform.
//!
//! - [`rate_limit`]: sliding-window request throttling and client identification.
//! - [`push`]: push registration over native shells and browsers.
//! - [`badge`]: unread counter mirrored to the OS badge.
//! - [`feed`] and [`notifications`]: change feed driven notification list.
//! - [`pipeline`]: wiring of the change feed to the notification list.

pub mod badge;
pub mod clock;
pub mod concurrency;
pub mod error;
pub mod feed;
mod macros;
pub mod notifications;
pub mod pipeline;
pub mod push;
pub mod rate_limit;
pub mod rest;
pub mod storage;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
