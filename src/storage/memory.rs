//! In-memory storage backend
//!
//! Nodes and edges are keyed by their global id; a `(source_id, role)`
//! index keeps relationship lookups off the full edge scan.

use super::traits::{ItemQuery, StorageAdapter, StorageResult};
use crate::graph::{Edge, EdgeId, Node, NodeId, Viewer};
use async_trait::async_trait;
use dashmap::DashMap;

type SourceKey = (NodeId, String);

/// DashMap-backed store, useful for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: DashMap<NodeId, Node>,
    edges: DashMap<EdgeId, Edge>,
    /// Edge ids per `(source_id, role)`, in insertion order
    by_source: DashMap<SourceKey, Vec<EdgeId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn collect_edges(&self, ids: &[EdgeId]) -> Vec<Edge> {
        ids.iter()
            .filter_map(|id| self.edges.get(id).map(|e| e.clone()))
            .collect()
    }

    fn edges_where(&self, predicate: impl Fn(&Edge) -> bool) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .edges
            .iter()
            .filter(|e| predicate(e.value()))
            .map(|e| e.value().clone())
            .collect();
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        edges
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    async fn get_item(
        &self,
        _viewer: &Viewer,
        owner_id: &NodeId,
        id: &NodeId,
    ) -> StorageResult<Option<Node>> {
        Ok(self
            .nodes
            .get(id)
            .filter(|n| &n.owner_id == owner_id)
            .map(|n| n.clone()))
    }

    async fn get_item_by_gid(
        &self,
        _viewer: &Viewer,
        id: &NodeId,
        class_name: Option<&str>,
    ) -> StorageResult<Option<Node>> {
        Ok(self
            .nodes
            .get(id)
            .filter(|n| class_name.map_or(true, |c| n.class_name == c))
            .map(|n| n.clone()))
    }

    async fn put_item(&self, _viewer: &Viewer, node: &Node) -> StorageResult<()> {
        self.nodes.insert(node.id.clone(), node.clone());
        Ok(())
    }

    async fn query_items(&self, _viewer: &Viewer, query: &ItemQuery) -> StorageResult<Vec<Node>> {
        let mut nodes: Vec<Node> = match query.ids {
            Some(ref ids) => ids
                .iter()
                .filter_map(|id| self.nodes.get(id).map(|n| n.clone()))
                .filter(|n| query.matches(n))
                .collect(),
            None => self
                .nodes
                .iter()
                .filter(|n| query.matches(n.value()))
                .map(|n| n.value().clone())
                .collect(),
        };
        query.arrange(&mut nodes);
        Ok(nodes)
    }

    async fn delete_item(
        &self,
        _viewer: &Viewer,
        owner_id: &NodeId,
        id: &NodeId,
    ) -> StorageResult<bool> {
        Ok(self
            .nodes
            .remove_if(id, |_, n| &n.owner_id == owner_id)
            .is_some())
    }

    async fn put_edge(&self, _viewer: &Viewer, edge: &Edge) -> StorageResult<()> {
        let key = (edge.source_id.clone(), edge.role.clone());
        if self.edges.insert(edge.id.clone(), edge.clone()).is_none() {
            self.by_source.entry(key).or_default().push(edge.id.clone());
        }
        Ok(())
    }

    async fn query_edges(
        &self,
        _viewer: &Viewer,
        source_id: &NodeId,
        role: &str,
    ) -> StorageResult<Vec<Edge>> {
        let key = (source_id.clone(), role.to_string());
        // Clone the id list so no index guard is held while reading edges
        let ids = match self.by_source.get(&key) {
            Some(ids) => ids.clone(),
            None => return Ok(Vec::new()),
        };
        Ok(self.collect_edges(&ids))
    }

    async fn query_edges_from(&self, _viewer: &Viewer, source_id: &NodeId) -> StorageResult<Vec<Edge>> {
        Ok(self.edges_where(|e| &e.source_id == source_id))
    }

    async fn query_edges_to(&self, _viewer: &Viewer, target_id: &NodeId) -> StorageResult<Vec<Edge>> {
        Ok(self.edges_where(|e| &e.target_id == target_id))
    }

    async fn delete_edge(&self, _viewer: &Viewer, edge_id: &EdgeId) -> StorageResult<bool> {
        match self.edges.remove(edge_id) {
            Some((_, edge)) => {
                let key = (edge.source_id, edge.role);
                // Drop the key along with its last edge
                self.by_source.remove_if_mut(&key, |_, ids| {
                    ids.retain(|id| id != edge_id);
                    ids.is_empty()
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::props;
    use crate::storage::{OrderBy, SortOrder};

    fn deck(viewer: &Viewer, title: &str) -> Node {
        Node::new(
            viewer.organization_scope_id().clone(),
            "Deck",
            props([("title", title)]),
        )
    }

    #[tokio::test]
    async fn get_item_respects_owner_scope() {
        let store = MemoryStore::new();
        let viewer = Viewer::for_testing();
        let node = deck(&viewer, "Intro");
        store.put_item(&viewer, &node).await.unwrap();

        let found = store
            .get_item(&viewer, viewer.organization_scope_id(), &node.id)
            .await
            .unwrap();
        assert_eq!(found, Some(node.clone()));

        let other_scope = store.get_item(&viewer, &NodeId::new(), &node.id).await.unwrap();
        assert!(other_scope.is_none());

        let by_gid = store
            .get_item_by_gid(&viewer, &node.id, Some("Person"))
            .await
            .unwrap();
        assert!(by_gid.is_none(), "class filter must apply");
    }

    #[tokio::test]
    async fn query_items_filters_and_orders() {
        let store = MemoryStore::new();
        let viewer = Viewer::for_testing();
        let a = deck(&viewer, "A");
        let b = deck(&viewer, "B");
        store.put_item(&viewer, &a).await.unwrap();
        store.put_item(&viewer, &b).await.unwrap();

        let query = ItemQuery::new()
            .for_class("Deck")
            .with_props(props([("title", "B")]));
        let result = store.query_items(&viewer, &query).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, b.id);

        let query = ItemQuery::new()
            .with_ids(vec![a.id.clone(), b.id.clone()])
            .ordered(OrderBy::Id, SortOrder::Asc)
            .with_limit(1);
        let result = store.query_items(&viewer, &query).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, a.id.clone().min(b.id.clone()));
    }

    #[tokio::test]
    async fn edge_index_tracks_role_and_deletes() {
        let store = MemoryStore::new();
        let viewer = Viewer::for_testing();
        let source = NodeId::new();
        let scope = viewer.organization_scope_id().clone();

        let first = Edge::new(scope.clone(), source.clone(), "Book", NodeId::new(), "Person", "author");
        let second = Edge::new(scope.clone(), source.clone(), "Book", NodeId::new(), "Person", "illustrator");
        store.put_edge(&viewer, &first).await.unwrap();
        store.put_edge(&viewer, &second).await.unwrap();

        let authors = store.query_edges(&viewer, &source, "author").await.unwrap();
        assert_eq!(authors, vec![first.clone()]);
        assert_eq!(store.query_edges_from(&viewer, &source).await.unwrap().len(), 2);

        assert!(store.delete_edge(&viewer, &first.id).await.unwrap());
        assert!(!store.delete_edge(&viewer, &first.id).await.unwrap());
        assert!(store.query_edges(&viewer, &source, "author").await.unwrap().is_empty());
        assert_eq!(store.edge_count(), 1);
        assert_eq!(store.by_source.len(), 1, "emptied index keys are dropped");

        assert!(store.delete_edge(&viewer, &second.id).await.unwrap());
        assert!(store.by_source.is_empty());
    }

    #[tokio::test]
    async fn default_walks_follow_edges_within_depth() {
        let store = MemoryStore::new();
        let viewer = Viewer::for_testing();
        let scope = viewer.organization_scope_id().clone();

        let org = Node::new(scope.clone(), "Organization", Default::default());
        let deck = Node::new(scope.clone(), "Deck", Default::default());
        let slide = Node::new(scope.clone(), "Slide", Default::default());
        for node in [&org, &deck, &slide] {
            store.put_item(&viewer, node).await.unwrap();
        }
        let org_deck = Edge::new(scope.clone(), org.id.clone(), "Organization", deck.id.clone(), "Deck", "deck");
        let deck_slide = Edge::new(scope.clone(), deck.id.clone(), "Deck", slide.id.clone(), "Slide", "slide");
        store.put_edge(&viewer, &org_deck).await.unwrap();
        store.put_edge(&viewer, &deck_slide).await.unwrap();

        let slides = store.query_descendants(&viewer, &org.id, "Slide", 2).await.unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].id, slide.id);

        let too_shallow = store.query_descendants(&viewer, &org.id, "Slide", 1).await.unwrap();
        assert!(too_shallow.is_empty());

        let orgs = store.query_ancestors(&viewer, &slide.id, "Organization", 5).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, org.id);
    }
}
