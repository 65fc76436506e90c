//! Edge representation: a directed, role-labeled link between two nodes

use super::node::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Create a new random EdgeId
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted, role-labeled directed edge
///
/// Edges carry their own identity and timestamp, independent of the nodes
/// they connect, so two nodes may be linked by several edges under
/// different roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Owning organization scope, stamped from the viewer at creation
    pub owner_id: NodeId,
    pub source_id: NodeId,
    pub source_class: String,
    pub target_id: NodeId,
    pub target_class: String,
    /// Relationship role (e.g., "author", "deck")
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Create a new edge
    pub fn new(
        owner_id: NodeId,
        source_id: NodeId,
        source_class: impl Into<String>,
        target_id: NodeId,
        target_class: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: EdgeId::new(),
            owner_id,
            source_id,
            source_class: source_class.into(),
            target_id,
            target_class: target_class.into(),
            role: role.into(),
            created_at: Utc::now(),
        }
    }

    /// True if this edge leaves `source_id` under `role`
    pub fn is_from(&self, source_id: &NodeId, role: &str) -> bool {
        &self.source_id == source_id && self.role == role
    }
}
