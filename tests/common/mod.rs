//! Common test utilities for nodeweave integration tests
//!
//! Provides the shared "library" class registry, engine constructors for
//! each backend, and a store wrapper that can be told to fail edge writes.

#![allow(dead_code)]

use async_trait::async_trait;
use nodeweave::storage::ItemQuery;
use nodeweave::{
    ClassSpec, Edge, EdgeId, FieldType, GraphEngine, MemoryStore, Node, NodeId, Registry,
    SchemaBuilder, StorageAdapter, StorageError, StorageResult, Viewer,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Classes used across the integration tests
///
/// - `Organization` has many `deck`
/// - `Book` has one `author` and one `illustrator`, both `Person`
/// - `Author` declares no relationships at all
pub fn library_builder() -> SchemaBuilder {
    SchemaBuilder::new()
        .class(
            ClassSpec::new("Organization")
                .field("name", FieldType::String)
                .many("deck", "Deck"),
        )
        .class(
            ClassSpec::new("Deck")
                .field("title", FieldType::String)
                .field("public", FieldType::Boolean)
                .field("slides", FieldType::Number),
        )
        .class(
            ClassSpec::new("Book")
                .field("title", FieldType::String)
                .one("author", "Person")
                .one("illustrator", "Person"),
        )
        .class(ClassSpec::new("Person").field("name", FieldType::String))
        .class(ClassSpec::new("Author").field("name", FieldType::String))
}

pub fn library_registry() -> Registry {
    library_builder().build().expect("library registry builds")
}

pub fn engine_on(store: Arc<dyn StorageAdapter>) -> GraphEngine {
    GraphEngine::new(store, library_registry())
}

pub fn memory_engine() -> GraphEngine {
    engine_on(Arc::new(MemoryStore::new()))
}

pub fn viewer() -> Viewer {
    Viewer::for_testing()
}

/// Memory store whose edge writes fail while `fail_edges` is set and whose
/// node deletes fail while `fail_deletes` is set
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_edges: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_edges(&self, fail: bool) {
        self.fail_edges.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageAdapter for FlakyStore {
    async fn get_item(
        &self,
        viewer: &Viewer,
        owner_id: &NodeId,
        id: &NodeId,
    ) -> StorageResult<Option<Node>> {
        self.inner.get_item(viewer, owner_id, id).await
    }

    async fn get_item_by_gid(
        &self,
        viewer: &Viewer,
        id: &NodeId,
        class_name: Option<&str>,
    ) -> StorageResult<Option<Node>> {
        self.inner.get_item_by_gid(viewer, id, class_name).await
    }

    async fn put_item(&self, viewer: &Viewer, node: &Node) -> StorageResult<()> {
        self.inner.put_item(viewer, node).await
    }

    async fn query_items(&self, viewer: &Viewer, query: &ItemQuery) -> StorageResult<Vec<Node>> {
        self.inner.query_items(viewer, query).await
    }

    async fn delete_item(&self, viewer: &Viewer, owner_id: &NodeId, id: &NodeId) -> StorageResult<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("node delete refused".into()));
        }
        self.inner.delete_item(viewer, owner_id, id).await
    }

    async fn put_edge(&self, viewer: &Viewer, edge: &Edge) -> StorageResult<()> {
        if self.fail_edges.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("edge write refused".into()));
        }
        self.inner.put_edge(viewer, edge).await
    }

    async fn query_edges(
        &self,
        viewer: &Viewer,
        source_id: &NodeId,
        role: &str,
    ) -> StorageResult<Vec<Edge>> {
        self.inner.query_edges(viewer, source_id, role).await
    }

    async fn query_edges_from(&self, viewer: &Viewer, source_id: &NodeId) -> StorageResult<Vec<Edge>> {
        self.inner.query_edges_from(viewer, source_id).await
    }

    async fn query_edges_to(&self, viewer: &Viewer, target_id: &NodeId) -> StorageResult<Vec<Edge>> {
        self.inner.query_edges_to(viewer, target_id).await
    }

    async fn delete_edge(&self, viewer: &Viewer, edge_id: &EdgeId) -> StorageResult<bool> {
        self.inner.delete_edge(viewer, edge_id).await
    }
}
