//! Root mutation type
//!
//! Per class: `create<Class>`, `update<Class>`, `delete<Class>`. Per to-one
//! role: `create<Class><Role>`, `unlink<Class><Role>`, `delete<Class><Role>`.
//! Per to-many role: `create<Class><Role>Item`.

use super::convert::{id_arg, props_arg, upper_first, viewer, GraphqlResultExt};
use super::types::input_type;
use crate::graph::{GraphEngine, Properties};
use crate::schema::{Cardinality, ClassDef, Registry, ResolvedRelationship};
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, TypeRef};
use async_graphql::Value;

pub(crate) const MUTATION: &str = "Mutation";

/// `None` when the registry is empty: GraphQL objects need at least one field
pub(crate) fn mutation_root(registry: &Registry) -> Option<Object> {
    let mut root = Object::new(MUTATION);
    let mut fields = 0;
    for class in registry.classes() {
        for field in class_mutations(class, registry) {
            root = root.field(field);
            fields += 1;
        }
    }
    (fields > 0).then_some(root)
}

/// Names of every mutation field the registry yields, for conflict checks
pub(crate) fn mutation_names(registry: &Registry) -> Vec<String> {
    let mut names = Vec::new();
    for class in registry.classes() {
        let name = class.name();
        names.push(format!("create{}", name));
        if !class.fields().is_empty() {
            names.push(format!("update{}", name));
        }
        names.push(format!("delete{}", name));
        for relationship in class.relationships() {
            let role = upper_first(&relationship.role);
            match relationship.cardinality {
                Cardinality::One => {
                    names.push(format!("create{}{}", name, role));
                    names.push(format!("unlink{}{}", name, role));
                    names.push(format!("delete{}{}", name, role));
                }
                Cardinality::Many => names.push(format!("create{}{}Item", name, role)),
            }
        }
    }
    names
}

fn has_fields(registry: &Registry, class: &str) -> bool {
    registry
        .get(class)
        .map(|def| !def.fields().is_empty())
        .unwrap_or(false)
}

fn with_input(field: Field, registry: &Registry, class: &str, required: bool) -> Field {
    if !has_fields(registry, class) {
        return field;
    }
    let type_ref = if required {
        TypeRef::named_nn(input_type(class))
    } else {
        TypeRef::named(input_type(class))
    };
    field.argument(InputValue::new("input", type_ref))
}

fn id_argument() -> InputValue {
    InputValue::new("id", TypeRef::named_nn(TypeRef::ID))
}

fn class_mutations(class: &ClassDef, registry: &Registry) -> Vec<Field> {
    let name = class.name().to_string();
    let mut fields = Vec::new();

    let create = {
        let name = name.clone();
        Field::new(format!("create{}", name), TypeRef::named_nn(&name), move |ctx| {
            let name = name.clone();
            FieldFuture::new(async move {
                let engine = ctx.data::<GraphEngine>()?;
                let viewer = viewer(&ctx)?;
                let props = props_arg(&ctx.args, "input").gql()?.unwrap_or_default();
                let created = engine.create_node(viewer, &name, props).await.gql()?;
                Ok(Some(FieldValue::owned_any(created)))
            })
        })
    };
    fields.push(with_input(create, registry, &name, false));

    if !class.fields().is_empty() {
        let update = {
            let name = name.clone();
            Field::new(format!("update{}", name), TypeRef::named_nn(&name), move |ctx| {
                let name = name.clone();
                FieldFuture::new(async move {
                    let engine = ctx.data::<GraphEngine>()?;
                    let viewer = viewer(&ctx)?;
                    let id = id_arg(&ctx.args)?;
                    let changes = props_arg(&ctx.args, "input").gql()?.unwrap_or_default();
                    let entity = engine.find_node_or_throw(viewer, &name, &id).await.gql()?;
                    let updated = engine.update_node(viewer, entity, changes).await.gql()?;
                    Ok(Some(FieldValue::owned_any(updated)))
                })
            })
            .argument(id_argument())
        };
        fields.push(with_input(update, registry, &name, true));
    }

    let delete = {
        let name = name.clone();
        Field::new(
            format!("delete{}", name),
            TypeRef::named_nn(TypeRef::BOOLEAN),
            move |ctx| {
                let name = name.clone();
                FieldFuture::new(async move {
                    let engine = ctx.data::<GraphEngine>()?;
                    let viewer = viewer(&ctx)?;
                    let id = id_arg(&ctx.args)?;
                    let deleted = match engine.find_node(viewer, &name, &id).await.gql()? {
                        Some(entity) => engine.delete_node(viewer, &entity).await.gql()?,
                        None => false,
                    };
                    Ok(Some(Value::Boolean(deleted)))
                })
            },
        )
        .argument(id_argument())
    };
    fields.push(delete);

    for relationship in class.relationships() {
        match relationship.cardinality {
            Cardinality::One => fields.extend(to_one_mutations(relationship, registry)),
            Cardinality::Many => fields.push(to_many_mutation(relationship, registry)),
        }
    }
    fields
}

fn to_one_mutations(relationship: &ResolvedRelationship, registry: &Registry) -> [Field; 3] {
    let class = relationship.declaring_class.clone();
    let role = relationship.role.clone();
    let target = relationship.target.clone();
    let suffix = format!("{}{}", class, upper_first(&role));

    let create = {
        let (class, role) = (class.clone(), role.clone());
        Field::new(format!("create{}", suffix), TypeRef::named_nn(&target), move |ctx| {
            let (class, role) = (class.clone(), role.clone());
            FieldFuture::new(async move {
                let engine = ctx.data::<GraphEngine>()?;
                let viewer = viewer(&ctx)?;
                let id = id_arg(&ctx.args)?;
                let props = props_arg(&ctx.args, "input").gql()?.unwrap_or_default();
                let source = engine.find_node_or_throw(viewer, &class, &id).await.gql()?;
                let created = source.one(engine, &role).gql()?.create(viewer, props).await.gql()?;
                Ok(Some(FieldValue::owned_any(created)))
            })
        })
        .argument(id_argument())
    };

    let unlink = {
        let (class, role) = (class.clone(), role.clone());
        Field::new(format!("unlink{}", suffix), TypeRef::named(&target), move |ctx| {
            let (class, role) = (class.clone(), role.clone());
            FieldFuture::new(async move {
                let engine = ctx.data::<GraphEngine>()?;
                let viewer = viewer(&ctx)?;
                let id = id_arg(&ctx.args)?;
                let source = engine.find_node_or_throw(viewer, &class, &id).await.gql()?;
                let previous = source.one(engine, &role).gql()?.unlink(viewer).await.gql()?;
                Ok(previous.map(FieldValue::owned_any))
            })
        })
        .argument(id_argument())
    };

    let delete = {
        let (class, role) = (class.clone(), role.clone());
        Field::new(format!("delete{}", suffix), TypeRef::named(&target), move |ctx| {
            let (class, role) = (class.clone(), role.clone());
            FieldFuture::new(async move {
                let engine = ctx.data::<GraphEngine>()?;
                let viewer = viewer(&ctx)?;
                let id = id_arg(&ctx.args)?;
                let source = engine.find_node_or_throw(viewer, &class, &id).await.gql()?;
                let deleted = source.one(engine, &role).gql()?.delete(viewer).await.gql()?;
                Ok(deleted.map(FieldValue::owned_any))
            })
        })
        .argument(id_argument())
    };

    [with_input(create, registry, &target, false), unlink, delete]
}

fn to_many_mutation(relationship: &ResolvedRelationship, registry: &Registry) -> Field {
    let class = relationship.declaring_class.clone();
    let role = relationship.role.clone();
    let target = relationship.target.clone();
    let name = format!("create{}{}Item", class, upper_first(&role));

    let field = Field::new(name, TypeRef::named_nn(&target), move |ctx| {
        let (class, role) = (class.clone(), role.clone());
        FieldFuture::new(async move {
            let engine = ctx.data::<GraphEngine>()?;
            let viewer = viewer(&ctx)?;
            let id = id_arg(&ctx.args)?;
            let props: Properties = props_arg(&ctx.args, "input").gql()?.unwrap_or_default();
            let source = engine.find_node_or_throw(viewer, &class, &id).await.gql()?;
            let created = source
                .many(engine, &role)
                .gql()?
                .create_item(viewer, props)
                .await
                .gql()?;
            Ok(Some(FieldValue::owned_any(created)))
        })
    })
    .argument(id_argument());

    with_input(field, registry, &relationship.target, false)
}
