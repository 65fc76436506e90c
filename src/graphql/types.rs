//! Object, connection and input types derived from the registry

use super::convert::{
    connection_args, props_arg, scalar, to_value, viewer, GraphqlResultExt,
};
use crate::graph::{Entity, GraphEngine, Viewer};
use crate::query::{Connection, ConnectionEdge, PageInfo};
use crate::schema::{Cardinality, ClassDef, Registry, ResolvedRelationship};
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, TypeRef,
};
use async_graphql::Value;

pub(crate) const PAGE_INFO: &str = "PageInfo";
pub(crate) const VIEWER: &str = "ViewerContext";

pub(crate) fn connection_type(class: &str) -> String {
    format!("{}Connection", class)
}

pub(crate) fn edge_type(class: &str) -> String {
    format!("{}Edge", class)
}

pub(crate) fn input_type(class: &str) -> String {
    format!("{}Input", class)
}

pub(crate) fn where_type(class: &str) -> String {
    format!("{}Where", class)
}

fn string_field(name: &str, get: fn(&Entity) -> String) -> Field {
    Field::new(name, TypeRef::named_nn(TypeRef::STRING), move |ctx| {
        FieldFuture::new(async move {
            let entity = ctx.parent_value.try_downcast_ref::<Entity>()?;
            Ok(Some(Value::String(get(entity))))
        })
    })
}

/// The object type of a class: system fields, props and one field per role
pub(crate) fn class_object(class: &ClassDef, registry: &Registry) -> Object {
    let mut object = Object::new(class.name())
        .field(Field::new("id", TypeRef::named_nn(TypeRef::ID), |ctx| {
            FieldFuture::new(async move {
                let entity = ctx.parent_value.try_downcast_ref::<Entity>()?;
                Ok(Some(Value::String(entity.id().to_string())))
            })
        }))
        .field(Field::new("ownerId", TypeRef::named_nn(TypeRef::ID), |ctx| {
            FieldFuture::new(async move {
                let entity = ctx.parent_value.try_downcast_ref::<Entity>()?;
                Ok(Some(Value::String(entity.owner_id().to_string())))
            })
        }))
        .field(string_field("createdAt", |e| e.node().created_at.to_rfc3339()))
        .field(string_field("lastUpdatedAt", |e| {
            e.node().last_updated_at.to_rfc3339()
        }));

    for (name, field_type) in class.fields() {
        let key = name.clone();
        object = object.field(Field::new(name, TypeRef::named(scalar(*field_type)), move |ctx| {
            let key = key.clone();
            FieldFuture::new(async move {
                let entity = ctx.parent_value.try_downcast_ref::<Entity>()?;
                Ok(entity.prop(&key).map(to_value))
            })
        }));
    }

    for relationship in class.relationships() {
        let field = match relationship.cardinality {
            Cardinality::One => to_one_field(relationship),
            Cardinality::Many => to_many_field(relationship, registry),
        };
        object = object.field(field);
    }
    object
}

fn to_one_field(relationship: &ResolvedRelationship) -> Field {
    let role = relationship.role.clone();
    Field::new(&relationship.role, TypeRef::named(&relationship.target), move |ctx| {
        let role = role.clone();
        FieldFuture::new(async move {
            let engine = ctx.data::<GraphEngine>()?;
            let viewer = viewer(&ctx)?;
            let entity = ctx.parent_value.try_downcast_ref::<Entity>()?;
            let target = entity.one(engine, &role).gql()?.find(viewer).await.gql()?;
            Ok(target.map(FieldValue::owned_any))
        })
    })
}

fn to_many_field(relationship: &ResolvedRelationship, registry: &Registry) -> Field {
    let role = relationship.role.clone();
    let field = Field::new(
        &relationship.role,
        TypeRef::named_nn(connection_type(&relationship.target)),
        move |ctx| {
            let role = role.clone();
            FieldFuture::new(async move {
                let engine = ctx.data::<GraphEngine>()?;
                let viewer = viewer(&ctx)?;
                let entity = ctx.parent_value.try_downcast_ref::<Entity>()?;
                let args = connection_args(&ctx.args)?;
                let filter = props_arg(&ctx.args, "where").gql()?;
                let connection = entity
                    .many(engine, &role)
                    .gql()?
                    .connection(viewer, &args, filter.as_ref())
                    .await
                    .gql()?;
                Ok(Some(FieldValue::owned_any(connection)))
            })
        },
    )
    .argument(InputValue::new("first", TypeRef::named(TypeRef::INT)))
    .argument(InputValue::new("after", TypeRef::named(TypeRef::STRING)))
    .argument(InputValue::new("last", TypeRef::named(TypeRef::INT)))
    .argument(InputValue::new("before", TypeRef::named(TypeRef::STRING)));

    let has_fields = registry
        .get(&relationship.target)
        .map(|target| !target.fields().is_empty())
        .unwrap_or(false);
    if has_fields {
        field.argument(InputValue::new(
            "where",
            TypeRef::named(where_type(&relationship.target)),
        ))
    } else {
        field
    }
}

/// `<Class>Connection` and `<Class>Edge`
pub(crate) fn connection_objects(class: &str) -> [Object; 2] {
    let connection = Object::new(connection_type(class))
        .field(Field::new(
            "edges",
            TypeRef::named_nn_list_nn(edge_type(class)),
            |ctx| {
                FieldFuture::new(async move {
                    let connection = ctx.parent_value.try_downcast_ref::<Connection<Entity>>()?;
                    Ok(Some(FieldValue::list(
                        connection.edges.iter().cloned().map(FieldValue::owned_any),
                    )))
                })
            },
        ))
        .field(Field::new(
            "nodes",
            TypeRef::named_nn_list_nn(class),
            |ctx| {
                FieldFuture::new(async move {
                    let connection = ctx.parent_value.try_downcast_ref::<Connection<Entity>>()?;
                    Ok(Some(FieldValue::list(
                        connection.nodes().cloned().map(FieldValue::owned_any),
                    )))
                })
            },
        ))
        .field(Field::new("pageInfo", TypeRef::named_nn(PAGE_INFO), |ctx| {
            FieldFuture::new(async move {
                let connection = ctx.parent_value.try_downcast_ref::<Connection<Entity>>()?;
                Ok(Some(FieldValue::owned_any(connection.page_info.clone())))
            })
        }))
        .field(Field::new("totalCount", TypeRef::named_nn(TypeRef::INT), |ctx| {
            FieldFuture::new(async move {
                let connection = ctx.parent_value.try_downcast_ref::<Connection<Entity>>()?;
                Ok(Some(Value::Number(connection.total_count.into())))
            })
        }));

    let edge = Object::new(edge_type(class))
        .field(Field::new("cursor", TypeRef::named_nn(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let edge = ctx.parent_value.try_downcast_ref::<ConnectionEdge<Entity>>()?;
                Ok(Some(Value::String(edge.cursor.clone())))
            })
        }))
        .field(Field::new("node", TypeRef::named_nn(class), |ctx| {
            FieldFuture::new(async move {
                let edge = ctx.parent_value.try_downcast_ref::<ConnectionEdge<Entity>>()?;
                Ok(Some(FieldValue::owned_any(edge.node.clone())))
            })
        }));

    [connection, edge]
}

pub(crate) fn page_info_object() -> Object {
    fn flag(name: &str, get: fn(&PageInfo) -> bool) -> Field {
        Field::new(name, TypeRef::named_nn(TypeRef::BOOLEAN), move |ctx| {
            FieldFuture::new(async move {
                let info = ctx.parent_value.try_downcast_ref::<PageInfo>()?;
                Ok(Some(Value::Boolean(get(info))))
            })
        })
    }
    fn cursor(name: &str, get: fn(&PageInfo) -> Option<String>) -> Field {
        Field::new(name, TypeRef::named(TypeRef::STRING), move |ctx| {
            FieldFuture::new(async move {
                let info = ctx.parent_value.try_downcast_ref::<PageInfo>()?;
                Ok(get(info).map(Value::String))
            })
        })
    }

    Object::new(PAGE_INFO)
        .field(flag("hasNextPage", |p| p.has_next_page))
        .field(flag("hasPreviousPage", |p| p.has_previous_page))
        .field(cursor("startCursor", |p| p.start_cursor.clone()))
        .field(cursor("endCursor", |p| p.end_cursor.clone()))
}

pub(crate) fn viewer_object() -> Object {
    fn id(name: &str, get: fn(&Viewer) -> String) -> Field {
        Field::new(name, TypeRef::named_nn(TypeRef::ID), move |ctx| {
            FieldFuture::new(async move {
                let viewer = ctx.parent_value.try_downcast_ref::<Viewer>()?;
                Ok(Some(Value::String(get(viewer))))
            })
        })
    }

    Object::new(VIEWER)
        .field(id("identityId", |v| v.identity_id().to_string()))
        .field(id("organizationScopeId", |v| {
            v.organization_scope_id().to_string()
        }))
}

/// `<Class>Input` for writes and `<Class>Where` for filters
///
/// Only built for classes with fields: GraphQL input objects cannot be
/// empty.
pub(crate) fn input_objects(class: &ClassDef) -> Option<[InputObject; 2]> {
    if class.fields().is_empty() {
        return None;
    }
    let (input, filter) = class.fields().iter().fold(
        (
            InputObject::new(input_type(class.name())),
            InputObject::new(where_type(class.name())),
        ),
        |(input, filter), (name, field_type)| {
            (
                input.field(InputValue::new(name, TypeRef::named(scalar(*field_type)))),
                filter.field(InputValue::new(name, TypeRef::named(scalar(*field_type)))),
            )
        },
    );
    Some([input, filter])
}
