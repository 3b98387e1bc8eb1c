//! Snapshot store implementations.

mod file;
mod lmdb;
mod memory;

pub use file::FileSnapshotStore;
pub use lmdb::LmdbSnapshotStore;
pub use memory::InMemorySnapshotStore;
