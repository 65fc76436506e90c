//! Storage adapter contract
//!
//! The adapter is the engine's only channel to durable state. Nodes and
//! edges share one keyspace addressed by `(owner_id, id)`; edges are
//! additionally indexed by `(source_id, role)`.

use crate::graph::{Edge, EdgeId, Node, NodeId, Properties, Viewer};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Lock poisoned: {0}")]
    Poisoned(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Sort direction for item queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Column item queries are ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderBy {
    #[default]
    CreatedAt,
    LastUpdatedAt,
    Id,
}

/// Filter and ordering criteria for querying nodes
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    /// Restrict to one owner scope
    pub owner_id: Option<NodeId>,
    /// Restrict to one class
    pub class_name: Option<String>,
    /// Exact-match predicate over props
    pub props: Properties,
    /// Restrict to these ids
    pub ids: Option<Vec<NodeId>>,
    pub order: SortOrder,
    pub order_by: OrderBy,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn owned_by(mut self, owner_id: NodeId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_props(mut self, props: Properties) -> Self {
        self.props = props;
        self
    }

    pub fn with_ids(mut self, ids: Vec<NodeId>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn ordered(mut self, order_by: OrderBy, order: SortOrder) -> Self {
        self.order_by = order_by;
        self.order = order;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `node` satisfies every filter in this query
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(ref owner_id) = self.owner_id {
            if &node.owner_id != owner_id {
                return false;
            }
        }
        if let Some(ref class_name) = self.class_name {
            if &node.class_name != class_name {
                return false;
            }
        }
        if let Some(ref ids) = self.ids {
            if !ids.contains(&node.id) {
                return false;
            }
        }
        node.matches(&self.props)
    }

    /// Sort and truncate `nodes` according to this query
    pub fn arrange(&self, nodes: &mut Vec<Node>) {
        nodes.sort_by(|a, b| {
            let ordering = match self.order_by {
                OrderBy::CreatedAt => a.created_at.cmp(&b.created_at),
                OrderBy::LastUpdatedAt => a.last_updated_at.cmp(&b.last_updated_at),
                OrderBy::Id => a.id.cmp(&b.id),
            };
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        if let Some(limit) = self.limit {
            nodes.truncate(limit);
        }
    }
}

/// Trait for storage backends
///
/// Every call receives the acting [`Viewer`] so backends can attribute or
/// authorize it; the engine itself never interprets it beyond stamping
/// owners. Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    // === Node Operations ===

    /// Load a node by owner scope and id
    async fn get_item(
        &self,
        viewer: &Viewer,
        owner_id: &NodeId,
        id: &NodeId,
    ) -> StorageResult<Option<Node>>;

    /// Load a node by its global id, optionally requiring a class
    async fn get_item_by_gid(
        &self,
        viewer: &Viewer,
        id: &NodeId,
        class_name: Option<&str>,
    ) -> StorageResult<Option<Node>>;

    /// Save a node (insert or update)
    async fn put_item(&self, viewer: &Viewer, node: &Node) -> StorageResult<()>;

    /// Find nodes matching the query
    async fn query_items(&self, viewer: &Viewer, query: &ItemQuery) -> StorageResult<Vec<Node>>;

    /// Delete a node. Edges touching it are left alone.
    async fn delete_item(&self, viewer: &Viewer, owner_id: &NodeId, id: &NodeId)
        -> StorageResult<bool>;

    // === Edge Operations ===

    /// Save an edge
    async fn put_edge(&self, viewer: &Viewer, edge: &Edge) -> StorageResult<()>;

    /// Edges leaving `source_id` under `role`, oldest first (indexed lookup)
    async fn query_edges(
        &self,
        viewer: &Viewer,
        source_id: &NodeId,
        role: &str,
    ) -> StorageResult<Vec<Edge>>;

    /// All edges leaving `source_id`, oldest first
    async fn query_edges_from(&self, viewer: &Viewer, source_id: &NodeId) -> StorageResult<Vec<Edge>>;

    /// All edges arriving at `target_id`, oldest first
    async fn query_edges_to(&self, viewer: &Viewer, target_id: &NodeId) -> StorageResult<Vec<Edge>>;

    /// Delete an edge by id
    async fn delete_edge(&self, viewer: &Viewer, edge_id: &EdgeId) -> StorageResult<bool>;

    // === Graph Walks ===

    /// Nodes of `class_name` reachable from `id` by following edges
    /// forward, at most `max_depth` hops away, nearest first
    async fn query_descendants(
        &self,
        viewer: &Viewer,
        id: &NodeId,
        class_name: &str,
        max_depth: usize,
    ) -> StorageResult<Vec<Node>> {
        self.walk(viewer, id, class_name, max_depth, WalkDirection::Forward)
            .await
    }

    /// Nodes of `class_name` that reach `id` by following edges forward,
    /// at most `max_depth` hops away, nearest first
    async fn query_ancestors(
        &self,
        viewer: &Viewer,
        id: &NodeId,
        class_name: &str,
        max_depth: usize,
    ) -> StorageResult<Vec<Node>> {
        self.walk(viewer, id, class_name, max_depth, WalkDirection::Backward)
            .await
    }

    /// Breadth-first walk shared by the default graph-walk methods
    async fn walk(
        &self,
        viewer: &Viewer,
        id: &NodeId,
        class_name: &str,
        max_depth: usize,
        direction: WalkDirection,
    ) -> StorageResult<Vec<Node>> {
        let mut seen: HashSet<NodeId> = HashSet::from([id.clone()]);
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::from([(id.clone(), 0)]);
        let mut found = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let edges = match direction {
                WalkDirection::Forward => self.query_edges_from(viewer, &current).await?,
                WalkDirection::Backward => self.query_edges_to(viewer, &current).await?,
            };
            for edge in edges {
                let next = match direction {
                    WalkDirection::Forward => edge.target_id,
                    WalkDirection::Backward => edge.source_id,
                };
                if !seen.insert(next.clone()) {
                    continue;
                }
                if let Some(node) = self.get_item_by_gid(viewer, &next, None).await? {
                    if node.class_name == class_name {
                        found.push(node);
                    }
                }
                queue.push_back((next, depth + 1));
            }
        }

        Ok(found)
    }
}

/// Which way a graph walk follows edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkDirection {
    Forward,
    Backward,
}

/// Extension trait for opening stores from paths
pub trait OpenStore: StorageAdapter + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
