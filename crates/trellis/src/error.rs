//! Error types for schema construction and execution.
//!
//! Configuration and usage errors are returned to the immediate caller;
//! execution-time failures travel inside [`crate::execution::ExecutionResult`]
//! as [`GraphQLError`] values and never cross the façade as `Err`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// A construction-time schema configuration error.
///
/// Raised synchronously from [`crate::schema::SchemaBuilder::build`]; a
/// failed build leaves no partially constructed schema behind.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No query root type was supplied.
    #[error("schema requires a query root type")]
    MissingQueryRoot,

    /// Two distinct type declarations claimed the same name.
    #[error("duplicate type name `{name}`")]
    DuplicateTypeName { name: String },

    /// Two directive declarations (caller-supplied or built-in) share a name.
    #[error("duplicate directive name `@{name}`")]
    DuplicateDirective { name: String },

    /// A named type reference does not resolve to a registered type.
    #[error("unknown type `{name}` referenced by `{referrer}`")]
    UnknownType { name: String, referrer: String },

    /// The engine rejected the assembled schema components.
    #[error("engine rejected schema: {0}")]
    Engine(#[from] EngineError),
}

/// An error reported by the query engine while assembling its schema handle.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Creates a new engine error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Usage error: `execute_sync` was called against a resolver graph that
/// did not complete synchronously.
#[derive(Debug, Error)]
#[error("execution did not complete synchronously; use `execute` for asynchronous resolver graphs")]
pub struct SyncExecutionError;

/// Error establishing a subscription.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The query text failed to parse.
    #[error("failed to parse subscription query: {0}")]
    Parse(GraphQLError),

    /// The engine refused the subscription request.
    #[error("subscription rejected: {0}")]
    Rejected(GraphQLError),
}

/// A wire-level GraphQL error as it appears in a response's `errors` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLError {
    /// Human-readable error message.
    pub message: String,

    /// Path to the field that failed, if field-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,

    /// Structured error metadata (error codes and the like).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<HashMap<String, serde_json::Value>>,
}

/// One segment of an error path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl GraphQLError {
    /// Creates a new error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }

    /// Sets the field path.
    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = Some(path);
        self
    }

    /// Adds an extension entry.
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }

    /// Sets the `code` extension.
    pub fn with_code(self, code: impl Into<String>) -> Self {
        self.with_extension("code", serde_json::Value::String(code.into()))
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(path) = &self.path {
            write!(f, " at ")?;
            for (i, segment) in path.iter().enumerate() {
                if i > 0 {
                    write!(f, ".")?;
                }
                match segment {
                    PathSegment::Field(name) => write!(f, "{name}")?,
                    PathSegment::Index(index) => write!(f, "{index}")?,
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for GraphQLError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_display() {
        let error = GraphQLError::new("boom").with_path(vec![
            PathSegment::Field("users".to_string()),
            PathSegment::Index(2),
            PathSegment::Field("name".to_string()),
        ]);
        assert_eq!(error.to_string(), "boom at users.2.name");
    }

    #[test]
    fn test_graphql_error_code() {
        let error = GraphQLError::new("nope").with_code("NOT_FOUND");
        let extensions = error.extensions.unwrap();
        assert_eq!(extensions["code"], serde_json::json!("NOT_FOUND"));
    }

    #[test]
    fn test_path_segment_serializes_untagged() {
        let path = vec![PathSegment::Field("user".to_string()), PathSegment::Index(0)];
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!(["user", 0]));
    }

    #[test]
    fn test_schema_error_messages() {
        let error = SchemaError::DuplicateTypeName {
            name: "User".to_string(),
        };
        assert_eq!(error.to_string(), "duplicate type name `User`");

        let error = SchemaError::Engine(EngineError::new("bad root"));
        assert_eq!(error.to_string(), "engine rejected schema: bad root");
    }
}
