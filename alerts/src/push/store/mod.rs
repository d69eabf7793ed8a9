//! Persistence of [`crate::push::PushSubscriber`] records.

mod base;
mod memory;
mod rest;

pub use base::SubscriberStore;
pub use memory::MemorySubscriberStore;
pub use rest::{RestSubscriberStore, SUBSCRIBERS_TABLE};
