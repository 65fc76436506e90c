//! Class declarations and the resolved class registry

mod class;
mod registry;

pub use class::{Cardinality, ClassSpec, FieldType, LifecycleHook, RelationshipDecl};
pub use registry::{
    ClassDef, Registry, ResolvedRelationship, SchemaBuilder, SchemaError, SchemaResult,
    RESERVED_NAMES,
};
