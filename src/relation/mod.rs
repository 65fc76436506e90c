//! Derived relationship operations
//!
//! Each declared relationship yields a bound operation set on instances of
//! the declaring class: [`ToOne`] for `one`, [`ToMany`] for `many`. Both are
//! obtained through [`Entity::one`] / [`Entity::many`], which look the role
//! up in the entity's own class table.
//!
//! Creating through a relationship writes the target node first and the
//! edge second. There is no rollback: if the edge write fails the error is
//! returned and the target node stays persisted without its edge.

mod to_many;
mod to_one;

pub use to_many::ToMany;
pub use to_one::ToOne;

use crate::graph::{
    Edge, EdgeId, Entity, GraphEngine, GraphError, GraphResult, Node, NodeId, Properties, Viewer,
};
use crate::query::Cursored;
use crate::schema::ResolvedRelationship;
use crate::storage::ItemQuery;
use std::collections::HashMap;

/// An edge of the relationship and its target, if the target still exists
#[derive(Debug, Clone)]
pub(crate) struct Link {
    pub edge: Edge,
    pub target: Option<Entity>,
}

/// A live edge and its target, paged by edge identity
///
/// The same node may be linked more than once under a to-many role; each
/// edge is a distinct position in the ordered set.
#[derive(Debug, Clone)]
pub(crate) struct Linked {
    pub edge_id: EdgeId,
    pub target: Entity,
}

impl Cursored for Linked {
    fn cursor_key(&self) -> &str {
        self.edge_id.as_str()
    }
}

/// Shared plumbing for the bound operation sets
#[derive(Clone, Copy)]
pub(crate) struct Binding<'a> {
    pub engine: &'a GraphEngine,
    pub source: &'a Entity,
    pub relationship: &'a ResolvedRelationship,
}

impl<'a> Binding<'a> {
    pub fn role(&self) -> &'a str {
        &self.relationship.role
    }

    pub fn class(&self) -> &'a str {
        &self.relationship.declaring_class
    }

    /// Attach `(class, role)` context to storage failures
    pub fn context(&self, err: GraphError) -> GraphError {
        err.in_relationship(self.class(), self.role())
    }

    pub async fn edges(&self, viewer: &Viewer) -> GraphResult<Vec<Edge>> {
        self.engine
            .find_edges(viewer, self.source.id(), self.role())
            .await
            .map_err(|e| self.context(e))
    }

    /// Every edge of the role with its target, oldest edge first
    pub async fn links(&self, viewer: &Viewer) -> GraphResult<Vec<Link>> {
        let edges = self.edges(viewer).await?;
        let targets = self.fetch_targets(viewer, &edges, None).await?;
        Ok(edges
            .into_iter()
            .map(|edge| {
                let target = targets.get(&edge.target_id).cloned();
                Link { edge, target }
            })
            .collect())
    }

    /// Edges whose target exists (and matches `filter`), in edge order
    pub async fn linked(
        &self,
        viewer: &Viewer,
        filter: Option<&Properties>,
    ) -> GraphResult<Vec<Linked>> {
        let edges = self.edges(viewer).await?;
        let targets = self.fetch_targets(viewer, &edges, filter).await?;
        Ok(edges
            .into_iter()
            .filter_map(|edge| {
                targets.get(&edge.target_id).cloned().map(|target| Linked {
                    edge_id: edge.id,
                    target,
                })
            })
            .collect())
    }

    /// Targets of the role in edge order, optionally filtered by props
    pub async fn targets(
        &self,
        viewer: &Viewer,
        filter: Option<&Properties>,
    ) -> GraphResult<Vec<Entity>> {
        Ok(self
            .linked(viewer, filter)
            .await?
            .into_iter()
            .map(|linked| linked.target)
            .collect())
    }

    async fn fetch_targets(
        &self,
        viewer: &Viewer,
        edges: &[Edge],
        filter: Option<&Properties>,
    ) -> GraphResult<HashMap<NodeId, Entity>> {
        if edges.is_empty() {
            return Ok(HashMap::new());
        }
        let class = self.engine.class(&self.relationship.target)?;
        let mut ids: Vec<NodeId> = edges.iter().map(|e| e.target_id.clone()).collect();
        ids.sort();
        ids.dedup();
        let expected = ids.len();
        let mut query = ItemQuery::new()
            .for_class(class.name())
            .with_ids(ids);
        if let Some(filter) = filter {
            query = query.with_props(filter.clone());
        }

        let nodes: Vec<Node> = self
            .engine
            .store()
            .query_items(viewer, &query)
            .await
            .map_err(|e| self.context(e.into()))?;

        if filter.is_none() && nodes.len() < expected {
            tracing::warn!(
                class = self.class(),
                role = self.role(),
                source = %self.source.id(),
                expected,
                found = nodes.len(),
                "dangling edges skipped"
            );
        }

        Ok(nodes
            .into_iter()
            .map(|n| (n.id.clone(), Entity::new(n, class.clone())))
            .collect())
    }

    /// Create the target node (inheriting the source's owner) then the edge
    pub async fn create_linked(&self, viewer: &Viewer, props: Properties) -> GraphResult<Entity> {
        let class = self.engine.class(&self.relationship.target)?;
        let target = self
            .engine
            .insert_node(viewer, &class, self.source.owner_id().clone(), props)
            .await
            .map_err(|e| self.context(e))?;

        if let Err(err) = self
            .engine
            .create_edge(viewer, self.source, &target, self.role())
            .await
        {
            tracing::warn!(
                class = self.class(),
                role = self.role(),
                target = %target.id(),
                error = %err,
                "edge write failed; target node persisted without its edge"
            );
            return Err(self.context(err));
        }
        Ok(target)
    }

    pub async fn delete_edges(&self, viewer: &Viewer, edges: &[Edge]) -> GraphResult<()> {
        for edge in edges {
            self.engine
                .delete_edge(viewer, &edge.id)
                .await
                .map_err(|e| self.context(e))?;
        }
        Ok(())
    }
}
