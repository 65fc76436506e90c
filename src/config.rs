//! Configuration: engine tuning and YAML schema files

use crate::query::PageLimits;
use crate::schema::{ClassSpec, FieldType, Registry, RelationshipDecl, SchemaBuilder, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Engine tuning knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size when a connection is requested without `first`/`last`
    pub default_page_size: Option<usize>,
    /// Upper bound applied to `first`/`last`
    pub max_page_size: Option<usize>,
    /// Hop limit for ancestor/descendant walks
    pub max_traversal_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_size: None,
            max_page_size: Some(1000),
            max_traversal_depth: 8,
        }
    }
}

impl EngineConfig {
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

/// One class entry of a schema file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassEntry {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldType>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDecl>,
}

/// Declarative schema file
///
/// ```yaml
/// engine:
///   default_page_size: 20
/// classes:
///   - name: Organization
///     fields: { name: string }
///     relationships:
///       - { role: deck, cardinality: many, target: Deck }
///   - name: Deck
///     fields: { title: string, public: boolean }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
}

impl SchemaFile {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Phase one of registration: class specs with symbolic targets
    pub fn to_builder(&self) -> SchemaBuilder {
        self.classes.iter().fold(SchemaBuilder::new(), |builder, entry| {
            let spec = entry
                .fields
                .iter()
                .fold(ClassSpec::new(&entry.name), |spec, (name, ty)| spec.field(name, *ty));
            let spec = entry.relationships.iter().fold(spec, |spec, rel| {
                spec.relationship(&rel.role, rel.cardinality, &rel.target)
            });
            builder.class(spec)
        })
    }

    /// Both registration phases
    pub fn build_registry(&self) -> Result<Registry, ConfigError> {
        Ok(self.to_builder().build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Cardinality;

    const YAML: &str = r#"
engine:
  default_page_size: 20
classes:
  - name: Organization
    fields:
      name: string
    relationships:
      - role: deck
        cardinality: many
        target: Deck
  - name: Deck
    fields:
      title: string
      public: boolean
"#;

    #[test]
    fn parses_engine_and_classes() {
        let file = SchemaFile::from_yaml_str(YAML).unwrap();
        assert_eq!(file.engine.default_page_size, Some(20));
        assert_eq!(file.engine.max_page_size, Some(1000), "unset keys keep defaults");
        assert_eq!(file.classes.len(), 2);
        assert_eq!(file.classes[1].fields["public"], FieldType::Boolean);
    }

    #[test]
    fn builds_registry_from_file() {
        let registry = SchemaFile::from_yaml_str(YAML)
            .unwrap()
            .build_registry()
            .unwrap();
        let org = registry.get("Organization").unwrap();
        let deck = org.relationship("deck").unwrap();
        assert_eq!(deck.cardinality, Cardinality::Many);
        assert_eq!(deck.target, "Deck");
    }

    #[test]
    fn unresolved_target_surfaces_as_schema_error() {
        let yaml = r#"
classes:
  - name: Organization
    relationships:
      - { role: deck, cardinality: many, target: Deck }
"#;
        let err = SchemaFile::from_yaml_str(yaml)
            .unwrap()
            .build_registry()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Schema(SchemaError::UnresolvedTarget { .. })));
    }

    #[test]
    fn rejects_unknown_field_type() {
        let yaml = r#"
classes:
  - name: Deck
    fields: { title: text }
"#;
        assert!(matches!(
            SchemaFile::from_yaml_str(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }
}
