//! To-one relationship operations

use super::Binding;
use crate::graph::{Edge, Entity, GraphEngine, GraphError, GraphResult, Properties, Viewer};
use crate::schema::ResolvedRelationship;

/// Operations bound to one `(class, role)` to-one relationship of an entity
///
/// At most one edge per `(source, role)` is kept: `create` and `link`
/// replace whatever the role pointed at before. The previous target node is
/// left in place.
#[derive(Clone, Copy)]
pub struct ToOne<'a> {
    binding: Binding<'a>,
}

impl<'a> ToOne<'a> {
    pub(crate) fn new(
        engine: &'a GraphEngine,
        source: &'a Entity,
        relationship: &'a ResolvedRelationship,
    ) -> Self {
        Self {
            binding: Binding {
                engine,
                source,
                relationship,
            },
        }
    }

    pub fn role(&self) -> &'a str {
        self.binding.role()
    }

    pub fn target_class(&self) -> &'a str {
        &self.binding.relationship.target
    }

    /// The linked target, or `None` when no edge of this role exists
    ///
    /// If concurrent writers left several edges, the newest one wins.
    pub async fn find(&self, viewer: &Viewer) -> GraphResult<Option<Entity>> {
        let links = self.binding.links(viewer).await?;
        tracing::debug!(
            class = self.binding.class(),
            role = self.role(),
            edges = links.len(),
            "to-one find"
        );
        Ok(links.into_iter().rev().find_map(|link| link.target))
    }

    /// Like [`find`](Self::find), failing with `NotFound` naming the role
    pub async fn find_or_throw(&self, viewer: &Viewer) -> GraphResult<Entity> {
        self.find(viewer)
            .await?
            .ok_or_else(|| GraphError::NotFound {
                class: self.binding.class().to_string(),
                role: self.role().to_string(),
            })
    }

    /// Create a new target node and link it under this role
    pub async fn create(&self, viewer: &Viewer, props: Properties) -> GraphResult<Entity> {
        let previous = self.binding.edges(viewer).await?;
        let target = self.binding.create_linked(viewer, props).await?;
        self.binding.delete_edges(viewer, &previous).await?;
        tracing::debug!(
            class = self.binding.class(),
            role = self.role(),
            target = %target.id(),
            replaced = previous.len(),
            "to-one create"
        );
        self.binding.engine.after_create(viewer, &target).await?;
        Ok(target)
    }

    /// Point this role at an existing node
    pub async fn link(&self, viewer: &Viewer, target: &Entity) -> GraphResult<Edge> {
        let previous = self.binding.edges(viewer).await?;
        let edge = self
            .binding
            .engine
            .create_edge(viewer, self.binding.source, target, self.role())
            .await
            .map_err(|e| self.binding.context(e))?;
        self.binding.delete_edges(viewer, &previous).await?;
        Ok(edge)
    }

    /// Remove the edge, keeping the target node
    ///
    /// Idempotent. Returns the target that was linked, if any.
    pub async fn unlink(&self, viewer: &Viewer) -> GraphResult<Option<Entity>> {
        let links = self.binding.links(viewer).await?;
        let edges: Vec<Edge> = links.iter().map(|l| l.edge.clone()).collect();
        self.binding.delete_edges(viewer, &edges).await?;
        tracing::debug!(
            class = self.binding.class(),
            role = self.role(),
            removed = edges.len(),
            "to-one unlink"
        );
        Ok(links.into_iter().rev().find_map(|link| link.target))
    }

    /// Remove the edge and the target node
    ///
    /// Idempotent on the edge. Fails if deleting a target node fails.
    /// Returns the deleted target, if any.
    pub async fn delete(&self, viewer: &Viewer) -> GraphResult<Option<Entity>> {
        let links = self.binding.links(viewer).await?;
        let edges: Vec<Edge> = links.iter().map(|l| l.edge.clone()).collect();
        self.binding.delete_edges(viewer, &edges).await?;

        let mut deleted = None;
        for target in links.into_iter().filter_map(|link| link.target) {
            self.binding
                .engine
                .delete_node(viewer, &target)
                .await
                .map_err(|e| self.binding.context(e))?;
            deleted = Some(target);
        }
        tracing::debug!(
            class = self.binding.class(),
            role = self.role(),
            removed = edges.len(),
            "to-one delete"
        );
        Ok(deleted)
    }
}
