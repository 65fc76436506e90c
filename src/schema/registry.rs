//! Two-phase class registration and per-class capability tables
//!
//! Phase one collects [`ClassSpec`]s whose relationships name their targets
//! symbolically. Phase two ([`SchemaBuilder::build`]) resolves every target,
//! checks names, and freezes one [`ClassDef`] per class. Lookups are keyed
//! by `(declaring class, role)`, never by target class alone.

use super::class::{Cardinality, ClassSpec, FieldType, LifecycleHook};
use crate::graph::{GraphError, GraphResult, Properties};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Field names every class exposes implicitly
pub const RESERVED_NAMES: &[&str] = &["id", "ownerId", "createdAt", "lastUpdatedAt"];

/// Errors raised while building a schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Class declared twice: {0}")]
    DuplicateClass(String),

    #[error("Role '{role}' declared twice on class {class}")]
    DuplicateRole { class: String, role: String },

    #[error("Role '{role}' on class {class} targets unknown class {target}")]
    UnresolvedTarget {
        class: String,
        role: String,
        target: String,
    },

    #[error("Name '{name}' on class {class} clashes with another field or role")]
    NameConflict { class: String, name: String },

    #[error("Invalid name: '{0}'")]
    InvalidName(String),

    #[error("Unknown class: {0}")]
    UnknownClass(String),
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A relationship after its target has been resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelationship {
    /// Class that declares the relationship
    pub declaring_class: String,
    pub role: String,
    pub cardinality: Cardinality,
    /// Resolved target class name, guaranteed to be registered
    pub target: String,
}

/// Frozen definition of a class: its prop shape and capability table
pub struct ClassDef {
    name: String,
    fields: BTreeMap<String, FieldType>,
    relationships: BTreeMap<String, ResolvedRelationship>,
    hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl ClassDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldType> {
        &self.fields
    }

    /// Capability table entry for `role`
    pub fn relationship(&self, role: &str) -> Option<&ResolvedRelationship> {
        self.relationships.get(role)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &ResolvedRelationship> {
        self.relationships.values()
    }

    pub(crate) fn hooks(&self) -> &[Arc<dyn LifecycleHook>] {
        &self.hooks
    }

    /// Check props against the declared shape
    ///
    /// Unknown fields and type mismatches are rejected. Declared fields may
    /// be omitted.
    pub fn validate_props(&self, props: &Properties) -> GraphResult<()> {
        for (key, value) in props {
            match self.fields.get(key) {
                None => {
                    return Err(GraphError::Validation(format!(
                        "{} has no field '{}'",
                        self.name, key
                    )))
                }
                Some(field_type) if !field_type.accepts(value) => {
                    return Err(GraphError::Validation(format!(
                        "{}.{} expects {}, got {}",
                        self.name,
                        key,
                        field_type.as_str(),
                        value.type_name()
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("relationships", &self.relationships)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Collects class declarations before resolution
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    classes: Vec<ClassSpec>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class declaration
    pub fn class(mut self, spec: ClassSpec) -> Self {
        self.classes.push(spec);
        self
    }

    pub fn register(&mut self, spec: ClassSpec) -> &mut Self {
        self.classes.push(spec);
        self
    }

    /// Resolve all symbolic targets and freeze the registry
    pub fn build(self) -> SchemaResult<Registry> {
        let mut names: HashSet<&str> = HashSet::new();
        for spec in &self.classes {
            check_name(&spec.name)?;
            if !names.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateClass(spec.name.clone()));
            }
        }

        let mut classes = HashMap::with_capacity(self.classes.len());
        for spec in &self.classes {
            let def = resolve_class(spec, |target| names.contains(target))?;
            classes.insert(spec.name.clone(), Arc::new(def));
        }

        Ok(Registry { classes })
    }
}

fn resolve_class(spec: &ClassSpec, is_registered: impl Fn(&str) -> bool) -> SchemaResult<ClassDef> {
    for field in spec.fields.keys() {
        check_name(field)?;
        if RESERVED_NAMES.contains(&field.as_str()) {
            return Err(SchemaError::NameConflict {
                class: spec.name.clone(),
                name: field.clone(),
            });
        }
    }

    let mut relationships = BTreeMap::new();
    for decl in &spec.relationships {
        check_name(&decl.role)?;
        if RESERVED_NAMES.contains(&decl.role.as_str()) || spec.fields.contains_key(&decl.role) {
            return Err(SchemaError::NameConflict {
                class: spec.name.clone(),
                name: decl.role.clone(),
            });
        }
        if !is_registered(&decl.target) {
            return Err(SchemaError::UnresolvedTarget {
                class: spec.name.clone(),
                role: decl.role.clone(),
                target: decl.target.clone(),
            });
        }
        let resolved = ResolvedRelationship {
            declaring_class: spec.name.clone(),
            role: decl.role.clone(),
            cardinality: decl.cardinality,
            target: decl.target.clone(),
        };
        if relationships.insert(decl.role.clone(), resolved).is_some() {
            return Err(SchemaError::DuplicateRole {
                class: spec.name.clone(),
                role: decl.role.clone(),
            });
        }
    }

    Ok(ClassDef {
        name: spec.name.clone(),
        fields: spec.fields.clone(),
        relationships,
        hooks: spec.hooks.clone(),
    })
}

/// Names must be usable as GraphQL identifiers
fn check_name(name: &str) -> SchemaResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid && !name.starts_with("__") {
        Ok(())
    } else {
        Err(SchemaError::InvalidName(name.to_string()))
    }
}

/// All resolved classes, keyed by name
#[derive(Debug, Clone, Default)]
pub struct Registry {
    classes: HashMap<String, Arc<ClassDef>>,
}

impl Registry {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ClassDef>> {
        self.classes.get(name)
    }

    pub fn require(&self, name: &str) -> SchemaResult<&Arc<ClassDef>> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownClass(name.to_string()))
    }

    /// Classes sorted by name
    pub fn classes(&self) -> Vec<&Arc<ClassDef>> {
        let mut classes: Vec<_> = self.classes.values().collect();
        classes.sort_by(|a, b| a.name().cmp(b.name()));
        classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
