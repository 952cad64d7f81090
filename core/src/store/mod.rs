//! Durable storage: key/value backends and the reading position store.

pub mod backend;
pub mod file;
pub mod position;

pub use backend::{MemoryStorage, StorageBackend};
pub use file::FileStorage;
pub use position::{POSITIONS_KEY, PositionStore, Throttle};

pub type Result<T> = crate::Result<T>;
