//! GraphEngine: the main entry point for the object layer

use super::edge::{Edge, EdgeId};
use super::entity::Entity;
use super::node::{Node, NodeId, Properties};
use super::viewer::Viewer;
use crate::config::EngineConfig;
use crate::query::PaginationError;
use crate::schema::{ClassDef, Registry, SchemaError};
use crate::storage::{ItemQuery, StorageAdapter, StorageError};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur in engine operations
#[derive(Debug, Error)]
pub enum GraphError {
    /// Raised only by `find_or_throw`: no edge of this role leaves the node
    #[error("Not found: no '{role}' linked from {class}")]
    NotFound { class: String, role: String },

    #[error("{class} not found: {id}")]
    NodeNotFound { class: String, id: String },

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage failure, passed through unchanged
    #[error("Storage error: {0}")]
    Adapter(#[from] StorageError),

    /// A failure wrapped with the relationship it happened in
    #[error("{class}.{role}: {source}")]
    Relationship {
        class: String,
        role: String,
        source: Box<GraphError>,
    },

    #[error("{class} declares no relationship '{role}' of that cardinality")]
    UndeclaredRelationship { class: String, role: String },

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl GraphError {
    /// Attach relationship context to storage failures; other kinds pass
    /// through unchanged
    pub fn in_relationship(self, class: &str, role: &str) -> Self {
        match self {
            Self::Adapter(_) => Self::Relationship {
                class: class.to_string(),
                role: role.to_string(),
                source: Box::new(self),
            },
            other => other,
        }
    }

    /// The underlying error with any relationship context removed
    pub fn root(&self) -> &GraphError {
        match self {
            Self::Relationship { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_adapter(&self) -> bool {
        matches!(self.root(), Self::Adapter(_))
    }
}

impl From<PaginationError> for GraphError {
    fn from(err: PaginationError) -> Self {
        match err {
            PaginationError::InvalidCursor(cursor) => Self::InvalidCursor(cursor),
            PaginationError::ConflictingBounds => Self::Validation(err.to_string()),
        }
    }
}

/// Result type for engine operations
pub type GraphResult<T> = Result<T, GraphError>;

/// The main engine
///
/// Cheap to clone: holds the storage adapter, the frozen class registry and
/// the engine configuration. Keeps no state of its own; every call goes to
/// the adapter.
#[derive(Clone)]
pub struct GraphEngine {
    store: Arc<dyn StorageAdapter>,
    registry: Arc<Registry>,
    config: EngineConfig,
}

impl std::fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEngine")
            .field("classes", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}

impl GraphEngine {
    pub fn new(store: Arc<dyn StorageAdapter>, registry: Registry) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn StorageAdapter> {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolved definition of a registered class
    pub fn class(&self, name: &str) -> GraphResult<Arc<ClassDef>> {
        self.registry
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownClass(name.to_string()))
    }

    /// Bind a node to its class capability table
    pub fn entity(&self, node: Node) -> GraphResult<Entity> {
        let class = self.class(&node.class_name)?;
        Ok(Entity::new(node, class))
    }

    // === Node Operations ===

    /// Create a top-level node owned by the viewer's organization scope
    pub async fn create_node(
        &self,
        viewer: &Viewer,
        class_name: &str,
        props: Properties,
    ) -> GraphResult<Entity> {
        let class = self.class(class_name)?;
        let entity = self
            .insert_node(viewer, &class, viewer.organization_scope_id().clone(), props)
            .await?;
        self.after_create(viewer, &entity).await?;
        Ok(entity)
    }

    /// Validate and persist a node without running hooks
    pub(crate) async fn insert_node(
        &self,
        viewer: &Viewer,
        class: &Arc<ClassDef>,
        owner_id: NodeId,
        props: Properties,
    ) -> GraphResult<Entity> {
        class.validate_props(&props)?;
        let node = Node::new(owner_id, class.name(), props);
        self.store.put_item(viewer, &node).await?;
        tracing::debug!(class = class.name(), id = %node.id, viewer = %viewer, "node created");
        Ok(Entity::new(node, class.clone()))
    }

    /// Run the class's lifecycle hooks for a freshly created entity
    pub(crate) async fn after_create(&self, viewer: &Viewer, entity: &Entity) -> GraphResult<()> {
        for hook in entity.class().hooks() {
            hook.after_create(self, viewer, entity).await?;
        }
        Ok(())
    }

    /// Load a node of `class_name` in the viewer's scope
    pub async fn find_node(
        &self,
        viewer: &Viewer,
        class_name: &str,
        id: &NodeId,
    ) -> GraphResult<Option<Entity>> {
        let class = self.class(class_name)?;
        let node = self
            .store
            .get_item(viewer, viewer.organization_scope_id(), id)
            .await?;
        Ok(node
            .filter(|n| n.class_name == class.name())
            .map(|n| Entity::new(n, class)))
    }

    pub async fn find_node_or_throw(
        &self,
        viewer: &Viewer,
        class_name: &str,
        id: &NodeId,
    ) -> GraphResult<Entity> {
        self.find_node(viewer, class_name, id)
            .await?
            .ok_or_else(|| GraphError::NodeNotFound {
                class: class_name.to_string(),
                id: id.to_string(),
            })
    }

    /// Load a node by global id, whatever its class or scope
    pub async fn find_by_gid(&self, viewer: &Viewer, id: &NodeId) -> GraphResult<Option<Entity>> {
        match self.store.get_item_by_gid(viewer, id, None).await? {
            Some(node) => Ok(Some(self.entity(node)?)),
            None => Ok(None),
        }
    }

    /// Nodes of `class_name` in the viewer's scope matching `filter`
    pub async fn list_nodes(
        &self,
        viewer: &Viewer,
        class_name: &str,
        filter: &Properties,
    ) -> GraphResult<Vec<Entity>> {
        let class = self.class(class_name)?;
        class.validate_props(filter)?;
        let query = ItemQuery::new()
            .owned_by(viewer.organization_scope_id().clone())
            .for_class(class_name)
            .with_props(filter.clone());
        let nodes = self.store.query_items(viewer, &query).await?;
        Ok(nodes
            .into_iter()
            .map(|n| Entity::new(n, class.clone()))
            .collect())
    }

    /// Merge `changes` into an entity's props and persist it
    pub async fn update_node(
        &self,
        viewer: &Viewer,
        mut entity: Entity,
        changes: Properties,
    ) -> GraphResult<Entity> {
        entity.class().validate_props(&changes)?;
        entity.node_mut().apply(changes);
        self.store.put_item(viewer, entity.node()).await?;
        tracing::debug!(class = entity.class_name(), id = %entity.id(), "node updated");
        Ok(entity)
    }

    /// Delete an entity and every edge touching it
    pub async fn delete_node(&self, viewer: &Viewer, entity: &Entity) -> GraphResult<bool> {
        let mut edges = self.store.query_edges_from(viewer, entity.id()).await?;
        edges.extend(self.store.query_edges_to(viewer, entity.id()).await?);
        for edge in &edges {
            self.store.delete_edge(viewer, &edge.id).await?;
        }
        let deleted = self
            .store
            .delete_item(viewer, entity.owner_id(), entity.id())
            .await?;
        tracing::debug!(
            class = entity.class_name(),
            id = %entity.id(),
            edges = edges.len(),
            deleted,
            "node deleted"
        );
        Ok(deleted)
    }

    /// Entities of `class_name` reachable from `entity`
    pub async fn descendants(
        &self,
        viewer: &Viewer,
        entity: &Entity,
        class_name: &str,
        max_depth: Option<usize>,
    ) -> GraphResult<Vec<Entity>> {
        let class = self.class(class_name)?;
        let depth = max_depth.unwrap_or(self.config.max_traversal_depth);
        let nodes = self
            .store
            .query_descendants(viewer, entity.id(), class_name, depth)
            .await?;
        Ok(nodes
            .into_iter()
            .map(|n| Entity::new(n, class.clone()))
            .collect())
    }

    /// Entities of `class_name` from which `entity` is reachable
    pub async fn ancestors(
        &self,
        viewer: &Viewer,
        entity: &Entity,
        class_name: &str,
        max_depth: Option<usize>,
    ) -> GraphResult<Vec<Entity>> {
        let class = self.class(class_name)?;
        let depth = max_depth.unwrap_or(self.config.max_traversal_depth);
        let nodes = self
            .store
            .query_ancestors(viewer, entity.id(), class_name, depth)
            .await?;
        Ok(nodes
            .into_iter()
            .map(|n| Entity::new(n, class.clone()))
            .collect())
    }

    // === Edge Operations ===

    /// Persist an edge of `role` from `source` to `target`
    ///
    /// The role must be declared on the source's class and target the
    /// target's class. The owner is stamped from the viewer's scope.
    pub async fn create_edge(
        &self,
        viewer: &Viewer,
        source: &Entity,
        target: &Entity,
        role: &str,
    ) -> GraphResult<Edge> {
        let relationship = source.class().relationship(role).ok_or_else(|| {
            GraphError::UndeclaredRelationship {
                class: source.class_name().to_string(),
                role: role.to_string(),
            }
        })?;
        if relationship.target != target.class_name() {
            return Err(GraphError::Validation(format!(
                "{}.{} links to {}, not {}",
                source.class_name(),
                role,
                relationship.target,
                target.class_name()
            )));
        }

        let edge = Edge::new(
            viewer.organization_scope_id().clone(),
            source.id().clone(),
            source.class_name(),
            target.id().clone(),
            target.class_name(),
            role,
        );
        self.store.put_edge(viewer, &edge).await?;
        tracing::debug!(
            class = source.class_name(),
            role,
            source = %edge.source_id,
            target = %edge.target_id,
            "edge created"
        );
        Ok(edge)
    }

    /// Edges of `role` leaving `source_id`, oldest first
    pub async fn find_edges(
        &self,
        viewer: &Viewer,
        source_id: &NodeId,
        role: &str,
    ) -> GraphResult<Vec<Edge>> {
        Ok(self.store.query_edges(viewer, source_id, role).await?)
    }

    pub async fn delete_edge(&self, viewer: &Viewer, edge_id: &EdgeId) -> GraphResult<bool> {
        Ok(self.store.delete_edge(viewer, edge_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::props;
    use crate::schema::{ClassSpec, FieldType, LifecycleHook, SchemaBuilder};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook(AtomicUsize);

    #[async_trait]
    impl LifecycleHook for CountingHook {
        async fn after_create(
            &self,
            _engine: &GraphEngine,
            _viewer: &Viewer,
            _created: &Entity,
        ) -> GraphResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn engine_with_hook(hook: Arc<CountingHook>) -> GraphEngine {
        let registry = SchemaBuilder::new()
            .class(
                ClassSpec::new("Deck")
                    .field("title", FieldType::String)
                    .many("slide", "Slide")
                    .hook(hook),
            )
            .class(ClassSpec::new("Slide").field("body", FieldType::String))
            .build()
            .unwrap();
        GraphEngine::new(Arc::new(MemoryStore::new()), registry)
    }

    fn engine() -> GraphEngine {
        engine_with_hook(Arc::new(CountingHook(AtomicUsize::new(0))))
    }

    #[tokio::test]
    async fn create_then_find_in_scope() {
        let engine = engine();
        let viewer = Viewer::for_testing();
        let deck = engine
            .create_node(&viewer, "Deck", props([("title", "Intro")]))
            .await
            .unwrap();
        assert_eq!(deck.owner_id(), viewer.organization_scope_id());

        let found = engine.find_node(&viewer, "Deck", deck.id()).await.unwrap();
        assert_eq!(found.map(|e| e.into_node()), Some(deck.node().clone()));

        let outsider = Viewer::for_testing();
        assert!(engine.find_node(&outsider, "Deck", deck.id()).await.unwrap().is_none());

        let wrong_class = engine.find_node(&viewer, "Slide", deck.id()).await.unwrap();
        assert!(wrong_class.is_none());
    }

    #[tokio::test]
    async fn create_rejects_unknown_fields() {
        let engine = engine();
        let viewer = Viewer::for_testing();
        let err = engine
            .create_node(&viewer, "Deck", props([("subtitle", "x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));

        let err = engine
            .create_node(&viewer, "Nope", Properties::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownClass(_)));
    }

    #[tokio::test]
    async fn hooks_run_once_per_create() {
        let hook = Arc::new(CountingHook(AtomicUsize::new(0)));
        let engine = engine_with_hook(hook.clone());
        let viewer = Viewer::for_testing();
        engine.create_node(&viewer, "Deck", Properties::new()).await.unwrap();
        engine.create_node(&viewer, "Slide", Properties::new()).await.unwrap();
        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn update_merges_props_and_keeps_identity() {
        let engine = engine();
        let viewer = Viewer::for_testing();
        let deck = engine
            .create_node(&viewer, "Deck", props([("title", "Draft")]))
            .await
            .unwrap();
        let id = deck.id().clone();

        let updated = engine
            .update_node(&viewer, deck, props([("title", "Final")]))
            .await
            .unwrap();
        assert_eq!(updated.id(), &id);

        let reloaded = engine.find_node_or_throw(&viewer, "Deck", &id).await.unwrap();
        assert_eq!(reloaded.prop("title").and_then(|v| v.as_str()), Some("Final"));
    }

    #[tokio::test]
    async fn delete_node_removes_touching_edges() {
        let engine = engine();
        let viewer = Viewer::for_testing();
        let deck = engine.create_node(&viewer, "Deck", Properties::new()).await.unwrap();
        let slide = engine.create_node(&viewer, "Slide", Properties::new()).await.unwrap();
        engine.create_edge(&viewer, &deck, &slide, "slide").await.unwrap();

        assert!(engine.delete_node(&viewer, &slide).await.unwrap());
        assert!(engine.find_edges(&viewer, deck.id(), "slide").await.unwrap().is_empty());
        assert!(!engine.delete_node(&viewer, &slide).await.unwrap());
    }

    #[tokio::test]
    async fn create_edge_checks_declaration() {
        let engine = engine();
        let viewer = Viewer::for_testing();
        let deck = engine.create_node(&viewer, "Deck", Properties::new()).await.unwrap();
        let other = engine.create_node(&viewer, "Deck", Properties::new()).await.unwrap();
        let slide = engine.create_node(&viewer, "Slide", Properties::new()).await.unwrap();

        let err = engine.create_edge(&viewer, &deck, &other, "slide").await.unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));

        let err = engine.create_edge(&viewer, &slide, &deck, "deck").await.unwrap_err();
        assert!(matches!(err, GraphError::UndeclaredRelationship { .. }));
    }

    #[test]
    fn relationship_context_wraps_only_storage_errors() {
        let wrapped = GraphError::Adapter(StorageError::Backend("down".into()))
            .in_relationship("Book", "author");
        assert!(matches!(wrapped, GraphError::Relationship { .. }));
        assert!(wrapped.is_adapter());
        assert!(wrapped.to_string().contains("Book.author"));

        let untouched = GraphError::Validation("bad".into()).in_relationship("Book", "author");
        assert!(matches!(untouched, GraphError::Validation(_)));
    }
}
