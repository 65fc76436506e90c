//! Conversions between GraphQL values and the object layer

use crate::graph::{GraphError, GraphResult, NodeId, Properties, PropertyValue, Viewer};
use crate::query::ConnectionArgs;
use crate::schema::FieldType;
use async_graphql::dynamic::{ObjectAccessor, ResolverContext, TypeRef};
use async_graphql::{Error, ErrorExtensions, Number, Value};

pub(crate) fn scalar(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => TypeRef::STRING,
        FieldType::Number => TypeRef::FLOAT,
        FieldType::Boolean => TypeRef::BOOLEAN,
    }
}

pub(crate) fn to_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Bool(b) => Value::Boolean(*b),
        PropertyValue::Number(n) => Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        PropertyValue::String(s) => Value::String(s.clone()),
    }
}

fn from_value(key: &str, value: &Value) -> GraphResult<Option<PropertyValue>> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(PropertyValue::Bool(*b))),
        Value::String(s) => Ok(Some(PropertyValue::String(s.clone()))),
        Value::Number(n) => n
            .as_f64()
            .map(|n| Some(PropertyValue::Number(n)))
            .ok_or_else(|| GraphError::Validation(format!("field '{}': number out of range", key))),
        other => Err(GraphError::Validation(format!(
            "field '{}': unsupported value {}",
            key, other
        ))),
    }
}

/// Read an input object argument into props; null entries are dropped
pub(crate) fn props_arg(args: &ObjectAccessor<'_>, name: &str) -> GraphResult<Option<Properties>> {
    let input = match args.get(name) {
        Some(input) if !input.is_null() => input,
        _ => return Ok(None),
    };
    let object = input
        .object()
        .map_err(|e| GraphError::Validation(e.message))?;

    let mut props = Properties::new();
    for (key, value) in object.iter() {
        if let Some(value) = from_value(key.as_str(), value.as_value())? {
            props.insert(key.to_string(), value);
        }
    }
    Ok(Some(props))
}

fn count_arg(args: &ObjectAccessor<'_>, name: &str) -> async_graphql::Result<Option<usize>> {
    match args.get(name) {
        Some(value) if !value.is_null() => {
            let n = value.i64()?;
            usize::try_from(n)
                .map(Some)
                .map_err(|_| graphql_error(GraphError::Validation(format!("{} must be >= 0", name))))
        }
        _ => Ok(None),
    }
}

fn string_arg(args: &ObjectAccessor<'_>, name: &str) -> async_graphql::Result<Option<String>> {
    match args.get(name) {
        Some(value) if !value.is_null() => Ok(Some(value.string()?.to_string())),
        _ => Ok(None),
    }
}

pub(crate) fn connection_args(args: &ObjectAccessor<'_>) -> async_graphql::Result<ConnectionArgs> {
    Ok(ConnectionArgs {
        first: count_arg(args, "first")?,
        after: string_arg(args, "after")?,
        last: count_arg(args, "last")?,
        before: string_arg(args, "before")?,
    })
}

pub(crate) fn id_arg(args: &ObjectAccessor<'_>) -> async_graphql::Result<NodeId> {
    Ok(NodeId::from(args.try_get("id")?.string()?))
}

/// The identity the request runs as; its absence is an error
pub(crate) fn viewer<'a>(ctx: &'a ResolverContext<'_>) -> async_graphql::Result<&'a Viewer> {
    ctx.data_opt::<Viewer>().ok_or_else(|| {
        Error::new("no viewer in request context")
            .extend_with(|_, ext| ext.set("code", "UNAUTHENTICATED"))
    })
}

/// Map an engine error to a GraphQL error with a `code` extension
pub(crate) fn graphql_error(err: GraphError) -> Error {
    let code = match err.root() {
        GraphError::NotFound { .. } | GraphError::NodeNotFound { .. } => "NOT_FOUND",
        GraphError::InvalidCursor(_) => "INVALID_CURSOR",
        GraphError::Validation(_) => "VALIDATION",
        GraphError::Adapter(_) | GraphError::Relationship { .. } => "STORAGE",
        GraphError::UndeclaredRelationship { .. } => "UNDECLARED_RELATIONSHIP",
        GraphError::UnknownClass(_) => "UNKNOWN_CLASS",
        GraphError::Schema(_) => "SCHEMA",
    };
    Error::new(err.to_string()).extend_with(|_, ext| ext.set("code", code))
}

pub(crate) trait GraphqlResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> GraphqlResultExt<T> for GraphResult<T> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(graphql_error)
    }
}

pub(crate) fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
