//! Sliding-window request throttling.
//!
//! A [`RateLimiter`] keeps, per caller identifier, the instants of accepted requests that
//! still fall inside the window `(now - window, now]`. Entries are created lazily on the
//! first check and evicted by a periodic sweep once they are empty.

mod client_ip;
mod entry;
mod limiter;
mod store;

pub use client_ip::{FORWARDED_FOR_HEADER, REAL_IP_HEADER, UNKNOWN_CLIENT, get_client_ip};
pub use entry::{RateLimitEntry, RateLimitResult};
pub use limiter::RateLimiter;
pub use store::{MemoryRateLimitStore, RateLimitStore};
