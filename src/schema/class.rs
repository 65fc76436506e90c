//! Class declarations: prop shape, relationships and lifecycle hooks

use crate::graph::{Entity, GraphEngine, GraphResult, PropertyValue, Viewer};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Primitive type of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
}

impl FieldType {
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        matches!(
            (self, value),
            (Self::String, PropertyValue::String(_))
                | (Self::Number, PropertyValue::Number(_))
                | (Self::Boolean, PropertyValue::Bool(_))
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// To-one or to-many
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// A relationship as declared, with a symbolic target class name
///
/// Targets are resolved when the whole schema is built, so classes may
/// reference each other regardless of registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDecl {
    pub role: String,
    pub cardinality: Cardinality,
    pub target: String,
}

/// Callback invoked at defined points of a node's lifecycle
///
/// `after_create` runs once the node (and, when created through a
/// relationship, its edge) is persisted. Errors propagate to the caller of
/// the create operation; the node stays persisted.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    async fn after_create(
        &self,
        engine: &GraphEngine,
        viewer: &Viewer,
        created: &Entity,
    ) -> GraphResult<()>;
}

/// Declaration of a node class, before target resolution
#[derive(Clone)]
pub struct ClassSpec {
    pub(crate) name: String,
    pub(crate) fields: BTreeMap<String, FieldType>,
    pub(crate) relationships: Vec<RelationshipDecl>,
    pub(crate) hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            relationships: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    /// Declare a to-one relationship
    pub fn one(self, role: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationship(role, Cardinality::One, target)
    }

    /// Declare a to-many relationship
    pub fn many(self, role: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationship(role, Cardinality::Many, target)
    }

    pub fn relationship(
        mut self,
        role: impl Into<String>,
        cardinality: Cardinality,
        target: impl Into<String>,
    ) -> Self {
        self.relationships.push(RelationshipDecl {
            role: role.into(),
            cardinality,
            target: target.into(),
        });
        self
    }

    /// Register a lifecycle hook
    pub fn hook(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }
}

impl std::fmt::Debug for ClassSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassSpec")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("relationships", &self.relationships)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_accepts_matching_primitive_only() {
        assert!(FieldType::String.accepts(&PropertyValue::from("x")));
        assert!(!FieldType::String.accepts(&PropertyValue::from(1.0)));
        assert!(FieldType::Number.accepts(&PropertyValue::from(1i64)));
        assert!(FieldType::Boolean.accepts(&PropertyValue::from(false)));
        assert!(!FieldType::Boolean.accepts(&PropertyValue::from("false")));
    }

    #[test]
    fn builder_collects_declarations_in_order() {
        let spec = ClassSpec::new("Book")
            .field("title", FieldType::String)
            .one("author", "Person")
            .one("illustrator", "Person")
            .many("chapter", "Chapter");

        let roles: Vec<_> = spec.relationships.iter().map(|r| r.role.as_str()).collect();
        assert_eq!(roles, vec!["author", "illustrator", "chapter"]);
        assert_eq!(spec.relationships[2].cardinality, Cardinality::Many);
    }

    #[test]
    fn cardinality_serializes_lowercase() {
        let json = serde_json::to_string(&Cardinality::Many).unwrap();
        assert_eq!(json, "\"many\"");
        let parsed: FieldType = serde_json::from_str("\"boolean\"").unwrap();
        assert_eq!(parsed, FieldType::Boolean);
    }
}
