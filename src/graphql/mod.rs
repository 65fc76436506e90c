//! GraphQL API derived from the class registry
//!
//! The schema is built at runtime from the registry:
//! - one object type per class, with a `<Target>Connection` field for every
//!   to-many role and a nullable field for every to-one role
//! - a root `Query` with `viewer` and `<class>(id: ID!)`
//! - a root `Mutation` exposing the derived relationship operations
//!
//! Resolvers read the [`Viewer`] from request data; a request without one
//! fails. Use [`execute`] to attach it.

mod convert;
mod mutation;
mod query;
mod types;

use crate::graph::{GraphEngine, Viewer};
use crate::schema::Registry;
use async_graphql::dynamic::Schema;
use async_graphql::{Request, Response};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while deriving the GraphQL schema
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("GraphQL schema error: {0}")]
    Build(String),

    #[error("Generated name conflict: {0}")]
    NameConflict(String),
}

/// Build the dynamic schema for an engine's registry
pub fn build_schema(engine: GraphEngine) -> Result<Schema, ApiError> {
    let registry = engine.registry();
    check_names(registry)?;

    let mutation = mutation::mutation_root(registry);
    let mut builder = Schema::build(
        query::QUERY,
        mutation.as_ref().map(|_| mutation::MUTATION),
        None,
    )
    .register(query::query_root(registry))
    .register(types::page_info_object())
    .register(types::viewer_object());

    if let Some(mutation) = mutation {
        builder = builder.register(mutation);
    }
    for class in registry.classes() {
        builder = builder.register(types::class_object(class, registry));
        for object in types::connection_objects(class.name()) {
            builder = builder.register(object);
        }
        if let Some(inputs) = types::input_objects(class) {
            for input in inputs {
                builder = builder.register(input);
            }
        }
    }

    let schema = builder
        .data(engine.clone())
        .finish()
        .map_err(|e| ApiError::Build(e.to_string()))?;
    tracing::debug!(classes = engine.registry().len(), "graphql schema built");
    Ok(schema)
}

/// Run a request on behalf of `viewer`
pub async fn execute(schema: &Schema, viewer: Viewer, request: impl Into<Request>) -> Response {
    let request = request.into().data(viewer);
    schema.execute(request).await
}

/// SDL of the schema derived from `engine`
pub fn sdl(engine: GraphEngine) -> Result<String, ApiError> {
    Ok(build_schema(engine)?.sdl())
}

/// Reject registries whose derived type or field names would collide
fn check_names(registry: &Registry) -> Result<(), ApiError> {
    let mut type_names: HashSet<String> = [
        query::QUERY,
        mutation::MUTATION,
        types::PAGE_INFO,
        types::VIEWER,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    for class in registry.classes() {
        let name = class.name();
        claim(&mut type_names, name.to_string())?;
        claim(&mut type_names, types::connection_type(name))?;
        claim(&mut type_names, types::edge_type(name))?;
        if !class.fields().is_empty() {
            claim(&mut type_names, types::input_type(name))?;
            claim(&mut type_names, types::where_type(name))?;
        }
    }

    let mut roots = HashSet::from(["viewer".to_string()]);
    for class in registry.classes() {
        claim(&mut roots, convert::lower_first(class.name()))?;
    }

    let mut mutations = HashSet::new();
    for name in mutation::mutation_names(registry) {
        claim(&mut mutations, name)?;
    }
    Ok(())
}

fn claim(taken: &mut HashSet<String>, name: String) -> Result<(), ApiError> {
    if taken.contains(&name) {
        return Err(ApiError::NameConflict(name));
    }
    taken.insert(name);
    Ok(())
}
