//! Node representation: the base record every declared class persists as

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a node
///
/// Serializes as a plain string. Fresh ids are UUID v4; ids read back from
/// storage or handed in by a transport are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new random NodeId
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a NodeId from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Typed property values
///
/// Only primitives are stored; nested values are rejected at the class
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl PropertyValue {
    /// Name of the primitive type, as used in validation messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Properties collection, ordered by field name
pub type Properties = BTreeMap<String, PropertyValue>;

/// Build a [`Properties`] map from `(name, value)` pairs
pub fn props<K, V, I>(pairs: I) -> Properties
where
    K: Into<String>,
    V: Into<PropertyValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A persisted entity instance of a declared class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Globally unique, immutable identifier
    pub id: NodeId,
    /// Owning organization scope; immutable after creation
    pub owner_id: NodeId,
    /// Declared class this node is an instance of
    pub class_name: String,
    /// Mutable property bag, validated against the class's field shape
    pub props: Properties,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl Node {
    /// Create a new node owned by `owner_id`
    pub fn new(owner_id: NodeId, class_name: impl Into<String>, props: Properties) -> Self {
        let now = Utc::now();
        Self {
            id: NodeId::new(),
            owner_id,
            class_name: class_name.into(),
            props,
            created_at: now,
            last_updated_at: now,
        }
    }

    /// Add a property to the node
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn prop(&self, key: &str) -> Option<&PropertyValue> {
        self.props.get(key)
    }

    /// Exact-match predicate: every filter entry must be present and equal
    pub fn matches(&self, filter: &Properties) -> bool {
        filter
            .iter()
            .all(|(key, expected)| self.props.get(key) == Some(expected))
    }

    /// Merge `changes` into the property bag and bump `last_updated_at`
    pub fn apply(&mut self, changes: Properties) {
        self.props.extend(changes);
        self.last_updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_requires_every_filter_entry() {
        let node = Node::new(NodeId::new(), "Deck", props([("title", "Intro")]))
            .with_prop("public", true);

        assert!(node.matches(&Properties::new()));
        assert!(node.matches(&props([("title", "Intro")])));
        assert!(!node.matches(&props([("title", "intro")])));
        assert!(!node.matches(&props([("missing", "x")])));
    }

    #[test]
    fn apply_merges_and_touches() {
        let mut node = Node::new(NodeId::new(), "Deck", props([("title", "Intro")]));
        let before = node.last_updated_at;

        node.apply(props([("slides", 12i64)]));

        assert_eq!(node.prop("title").and_then(|v| v.as_str()), Some("Intro"));
        assert_eq!(node.prop("slides").and_then(|v| v.as_f64()), Some(12.0));
        assert!(node.last_updated_at >= before);
        assert_eq!(node.created_at, before);
    }

    #[test]
    fn property_values_deserialize_untagged() {
        let parsed: Properties =
            serde_json::from_str(r#"{"a": true, "b": 2.5, "c": "text"}"#).unwrap();
        assert_eq!(parsed["a"], PropertyValue::Bool(true));
        assert_eq!(parsed["b"], PropertyValue::Number(2.5));
        assert_eq!(parsed["c"], PropertyValue::String("text".into()));
    }
}
