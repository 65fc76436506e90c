//! Nodeweave: Schema-Driven Object Graph over a Key-Value Store
//!
//! Declare classes with typed fields and named relationships; nodeweave
//! derives the relationship operations, stores nodes and edges through a
//! pluggable adapter, and exposes everything as a GraphQL API.
//!
//! # Core Concepts
//!
//! - **Classes**: named types declaring fields and `one`/`many` relationships
//! - **Nodes**: stored instances of a class, owned by an organization scope
//! - **Edges**: directed `(source, role, target)` records, one per link
//! - **Viewer**: the identity every operation runs on behalf of
//!
//! # Example
//!
//! ```
//! use nodeweave::{ClassSpec, FieldType, GraphEngine, MemoryStore, SchemaBuilder};
//! use std::sync::Arc;
//!
//! let registry = SchemaBuilder::new()
//!     .class(ClassSpec::new("Organization").many("deck", "Deck"))
//!     .class(ClassSpec::new("Deck").field("title", FieldType::String))
//!     .build()
//!     .unwrap();
//! let engine = GraphEngine::new(Arc::new(MemoryStore::new()), registry);
//! assert!(engine.registry().get("Deck").is_some());
//! ```

pub mod config;
mod graph;
pub mod graphql;
pub mod query;
pub mod relation;
pub mod schema;
pub mod storage;

pub use config::{ConfigError, EngineConfig, SchemaFile};
pub use graph::{
    props, Edge, EdgeId, Entity, GraphEngine, GraphError, GraphResult, Node, NodeId, Properties,
    PropertyValue, Viewer,
};
pub use query::{Connection, ConnectionArgs, PageInfo};
pub use relation::{ToMany, ToOne};
pub use schema::{
    Cardinality, ClassDef, ClassSpec, FieldType, LifecycleHook, Registry, SchemaBuilder,
    SchemaError,
};
pub use storage::{MemoryStore, OpenStore, SqliteStore, StorageAdapter, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
