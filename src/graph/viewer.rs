//! Viewer context: the acting identity and its organization scope

use super::node::NodeId;
use serde::{Deserialize, Serialize};

/// Immutable identity/scope value threaded through every operation
///
/// The engine never invents a viewer: transports derive one from their
/// session and call [`Viewer::new`]. [`Viewer::for_testing`] is the only
/// constructor that makes up identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewer {
    identity_id: NodeId,
    organization_scope_id: NodeId,
}

impl Viewer {
    pub fn new(identity_id: NodeId, organization_scope_id: NodeId) -> Self {
        Self {
            identity_id,
            organization_scope_id,
        }
    }

    /// Test-only entry point: a viewer with fresh random identity and scope
    pub fn for_testing() -> Self {
        Self::new(NodeId::new(), NodeId::new())
    }

    /// Test-only entry point: a fresh identity acting inside `scope`
    pub fn for_testing_in(scope: NodeId) -> Self {
        Self::new(NodeId::new(), scope)
    }

    pub fn identity_id(&self) -> &NodeId {
        &self.identity_id
    }

    /// Scope stamped as `owner_id` on every node and edge this viewer creates
    pub fn organization_scope_id(&self) -> &NodeId {
        &self.organization_scope_id
    }
}

impl std::fmt::Display for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.identity_id, self.organization_scope_id)
    }
}
