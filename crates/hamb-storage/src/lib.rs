//! Persistence for the Matter bridge
//!
//! [`Storage`] keeps one versioned JSON file per key in a directory.
//! [`BridgeStorage`] is the port the bridge service persists its
//! configurations through; [`FileBridgeStorage`] implements it on top of
//! [`Storage`] and [`MemoryBridgeStorage`] keeps everything in memory.

mod bridge_storage;
mod storage;

pub use bridge_storage::{BridgeList, BridgeStorage, FileBridgeStorage, MemoryBridgeStorage};
pub use storage::{load_versioned, Storable, Storage, StorageError, StorageFile, StorageResult};
