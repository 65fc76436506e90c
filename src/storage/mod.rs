//! Storage backends
//!
//! The engine talks to durable state only through the `StorageAdapter`
//! trait. `MemoryStore` serves tests and embedding; `SqliteStore` is the
//! persistent implementation used by the CLI.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    ItemQuery, OpenStore, OrderBy, SortOrder, StorageAdapter, StorageError, StorageResult,
    WalkDirection,
};
