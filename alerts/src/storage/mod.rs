//! Installation-local key/value storage.
//!
//! Holds the device identifier and the persisted badge state. Values are opaque
//! strings; callers own their encoding.

mod base;
mod file;
mod memory;

pub use base::LocalStore;
pub use file::FileStore;
pub use memory::MemoryStore;
