//! To-many relationship operations

use super::Binding;
use crate::graph::{Edge, Entity, GraphEngine, GraphResult, Properties, Viewer};
use crate::query::{paginate_with, Connection, ConnectionArgs};
use crate::schema::ResolvedRelationship;

/// Operations bound to one `(class, role)` to-many relationship of an entity
#[derive(Clone, Copy)]
pub struct ToMany<'a> {
    binding: Binding<'a>,
}

impl<'a> ToMany<'a> {
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

    /// All targets linked under this role, in insertion order
    pub async fn find_all(&self, viewer: &Viewer) -> GraphResult<Vec<Entity>> {
        let targets = self.binding.targets(viewer, None).await?;
        tracing::debug!(
            class = self.binding.class(),
            role = self.role(),
            found = targets.len(),
            "to-many find_all"
        );
        Ok(targets)
    }

    /// Targets whose props exactly match every entry of `filter`
    ///
    /// Filter keys must be declared fields of the target class.
    pub async fn query(&self, viewer: &Viewer, filter: &Properties) -> GraphResult<Vec<Entity>> {
        self.validate_filter(filter)?;
        self.binding.targets(viewer, Some(filter)).await
    }

    /// Number of edges of this role leaving the source
    pub async fn count(&self, viewer: &Viewer) -> GraphResult<usize> {
        Ok(self.binding.edges(viewer).await?.len())
    }

    /// Create a new target node and link it under this role
    pub async fn create_item(&self, viewer: &Viewer, props: Properties) -> GraphResult<Entity> {
        let target = self.binding.create_linked(viewer, props).await?;
        tracing::debug!(
            class = self.binding.class(),
            role = self.role(),
            target = %target.id(),
            "to-many create_item"
        );
        self.binding.engine.after_create(viewer, &target).await?;
        Ok(target)
    }

    /// Link an existing node under this role
    pub async fn link(&self, viewer: &Viewer, target: &Entity) -> GraphResult<Edge> {
        self.binding
            .engine
            .create_edge(viewer, self.binding.source, target, self.role())
            .await
            .map_err(|e| self.binding.context(e))
    }

    /// Remove every edge of this role pointing at `target`; the node stays
    pub async fn unlink(&self, viewer: &Viewer, target: &Entity) -> GraphResult<usize> {
        let edges: Vec<Edge> = self
            .binding
            .edges(viewer)
            .await?
            .into_iter()
            .filter(|e| &e.target_id == target.id())
            .collect();
        self.binding.delete_edges(viewer, &edges).await?;
        Ok(edges.len())
    }

    /// Cursor-paginated view over the same edge set
    ///
    /// Cursors address edges, so a node linked twice occupies two positions.
    pub async fn connection(
        &self,
        viewer: &Viewer,
        args: &ConnectionArgs,
        filter: Option<&Properties>,
    ) -> GraphResult<Connection<Entity>> {
        if let Some(filter) = filter {
            self.validate_filter(filter)?;
        }
        let items = self.binding.linked(viewer, filter).await?;
        let limits = self.binding.engine.config().page_limits();
        Ok(paginate_with(items, args, limits)?.map(|linked| linked.target))
    }

    fn validate_filter(&self, filter: &Properties) -> GraphResult<()> {
        let class = self.binding.engine.class(self.target_class())?;
        class.validate_props(filter)
    }
}
