//! Entity: a node bound to its class capability table

use super::engine::{GraphEngine, GraphError, GraphResult};
use super::node::{Node, NodeId, PropertyValue};
use crate::relation::{ToMany, ToOne};
use crate::schema::{Cardinality, ClassDef, ResolvedRelationship};
use std::sync::Arc;

/// A node together with the resolved definition of its class
///
/// Every node the engine hands out (query results, create results) is
/// wrapped in an `Entity`, so relationship operations are looked up in the
/// class's own table rather than in any shared registry.
#[derive(Debug, Clone)]
pub struct Entity {
    node: Node,
    class: Arc<ClassDef>,
}

impl Entity {
    pub(crate) fn new(node: Node, class: Arc<ClassDef>) -> Self {
        Self { node, class }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    pub fn id(&self) -> &NodeId {
        &self.node.id
    }

    pub fn owner_id(&self) -> &NodeId {
        &self.node.owner_id
    }

    pub fn class(&self) -> &Arc<ClassDef> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn prop(&self, key: &str) -> Option<&PropertyValue> {
        self.node.prop(key)
    }

    /// Declared relationships of this entity's class
    pub fn relationships(&self) -> impl Iterator<Item = &ResolvedRelationship> {
        self.class.relationships()
    }

    pub fn has_relationship(&self, role: &str) -> bool {
        self.class.relationship(role).is_some()
    }

    /// Operation set for the to-one relationship declared under `role`
    ///
    /// Fails with [`GraphError::UndeclaredRelationship`] when the class has
    /// no such role, or declares it as to-many.
    pub fn one<'a>(&'a self, engine: &'a GraphEngine, role: &str) -> GraphResult<ToOne<'a>> {
        let relationship = self.declared(role, Cardinality::One)?;
        Ok(ToOne::new(engine, self, relationship))
    }

    /// Operation set for the to-many relationship declared under `role`
    pub fn many<'a>(&'a self, engine: &'a GraphEngine, role: &str) -> GraphResult<ToMany<'a>> {
        let relationship = self.declared(role, Cardinality::Many)?;
        Ok(ToMany::new(engine, self, relationship))
    }

    fn declared(&self, role: &str, cardinality: Cardinality) -> GraphResult<&ResolvedRelationship> {
        self.class
            .relationship(role)
            .filter(|rel| rel.cardinality == cardinality)
            .ok_or_else(|| GraphError::UndeclaredRelationship {
                class: self.class.name().to_string(),
                role: role.to_string(),
            })
    }

    pub(crate) fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}
