//! Root query type

use super::convert::{id_arg, lower_first, viewer, GraphqlResultExt};
use super::types::VIEWER;
use crate::graph::GraphEngine;
use crate::schema::Registry;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, TypeRef};

pub(crate) const QUERY: &str = "Query";

/// `viewer` plus one `<class>(id: ID!)` lookup per registered class
pub(crate) fn query_root(registry: &Registry) -> Object {
    let mut root = Object::new(QUERY).field(Field::new("viewer", TypeRef::named_nn(VIEWER), |ctx| {
        FieldFuture::new(async move {
            let viewer = viewer(&ctx)?;
            Ok(Some(FieldValue::owned_any(viewer.clone())))
        })
    }));

    for class in registry.classes() {
        let name = class.name().to_string();
        root = root.field(
            Field::new(lower_first(&name), TypeRef::named(&name), move |ctx| {
                let name = name.clone();
                FieldFuture::new(async move {
                    let engine = ctx.data::<GraphEngine>()?;
                    let viewer = viewer(&ctx)?;
                    let id = id_arg(&ctx.args)?;
                    let found = engine.find_node(viewer, &name, &id).await.gql()?;
                    Ok(found.map(FieldValue::owned_any))
                })
            })
            .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID))),
        );
    }
    root
}
