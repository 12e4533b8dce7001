//! The query engine contract.
//!
//! The external engine owns parsing, validation and field resolution; the
//! orchestration core hands it assembled schema components, the middleware
//! chain and the per-request hook scope, and consumes [`Resolution`]
//! values back. Everything here is an explicit seam so the core is fully
//! testable against [`crate::testing::MockEngine`].

use crate::context::SharedRequestContext;
use crate::error::{EngineError, GraphQLError};
use crate::extensions::RequestScope;
use crate::middleware::MiddlewareChain;
use crate::registry::TypeRegistry;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use trellis_types::{ArgumentDeclaration, DirectiveDeclaration, DirectiveLocation, TypeRef};

/// Engine-facing descriptor of one directive.
#[derive(Debug, Clone)]
pub struct DirectiveDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub arguments: IndexMap<String, ArgumentDeclaration>,
    pub locations: Vec<DirectiveLocation>,
    pub repeatable: bool,
    /// True for the engine's baseline set (`@skip`, `@include`).
    pub built_in: bool,
}

impl DirectiveDescriptor {
    /// Converts a caller-supplied declaration.
    pub fn from_declaration(declaration: &DirectiveDeclaration) -> Self {
        Self {
            name: declaration.name.clone(),
            description: declaration.description.clone(),
            arguments: declaration.arguments.clone(),
            locations: declaration.locations.clone(),
            repeatable: declaration.repeatable,
            built_in: false,
        }
    }

    /// The baseline `@skip` directive.
    pub fn skip() -> Self {
        Self::conditional("skip", "Skips the field when `if` is true")
    }

    /// The baseline `@include` directive.
    pub fn include() -> Self {
        Self::conditional("include", "Includes the field only when `if` is true")
    }

    fn conditional(name: &str, description: &str) -> Self {
        let mut arguments = IndexMap::new();
        arguments.insert(
            "if".to_string(),
            ArgumentDeclaration::new("if", TypeRef::named("Boolean")),
        );
        Self {
            name: name.to_string(),
            description: Some(description.to_string()),
            arguments,
            locations: vec![
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            repeatable: false,
            built_in: true,
        }
    }
}

/// Assembled schema input handed to [`QueryEngine::assemble`].
#[derive(Debug, Clone)]
pub struct SchemaComponents {
    /// The populated type registry.
    pub registry: Arc<TypeRegistry>,
    /// Name of the query root type.
    pub query_type: String,
    /// Name of the mutation root type, if any.
    pub mutation_type: Option<String>,
    /// Name of the subscription root type, if any.
    pub subscription_type: Option<String>,
    /// Merged baseline plus caller directives.
    pub directives: Vec<DirectiveDescriptor>,
}

/// One execution request as the engine sees it.
pub struct EngineRequest {
    pub query: String,
    pub variables: HashMap<String, Value>,
    pub operation_name: Option<String>,
    pub root: Option<Value>,
    pub context: SharedRequestContext,
    /// Chain the engine must dispatch around every field resolution.
    pub middleware: Arc<MiddlewareChain>,
    /// Scope the engine fires parse/validation/execution hooks through.
    pub hooks: Arc<RequestScope>,
}

/// One subscription request as the engine sees it.
///
/// Deliberately carries no middleware chain or hook scope: subscriptions
/// bypass field interception and extension instrumentation.
pub struct SubscriptionRequest {
    pub variables: HashMap<String, Value>,
    pub operation_name: Option<String>,
    pub root: Option<Value>,
    pub context: SharedRequestContext,
}

/// The engine's raw response before façade normalization.
#[derive(Debug, Clone, Default)]
pub struct EngineResponse {
    pub data: Option<Value>,
    pub errors: Vec<GraphQLError>,
}

impl EngineResponse {
    /// Creates a response with data and no errors.
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Creates a failed response with a single error and null data.
    pub fn error(error: GraphQLError) -> Self {
        Self {
            data: None,
            errors: vec![error],
        }
    }
}

/// Classification of one execution: completed synchronously or not.
pub enum Resolution {
    /// Execution finished without suspending.
    Ready(EngineResponse),
    /// Execution must be awaited.
    Pending(BoxFuture<'static, EngineResponse>),
}

impl Resolution {
    /// Classifies a future by polling it once with a noop waker.
    ///
    /// Engines build their execution as one async block and call this to
    /// serve `execute` and `execute_sync` from a single code path: a
    /// fully synchronous resolver graph completes on the first poll.
    pub fn resolve_now<F>(future: F) -> Self
    where
        F: Future<Output = EngineResponse> + Send + 'static,
    {
        let mut boxed: BoxFuture<'static, EngineResponse> = Box::pin(future);
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        match boxed.as_mut().poll(&mut cx) {
            Poll::Ready(response) => Self::Ready(response),
            Poll::Pending => Self::Pending(boxed),
        }
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(response) => f.debug_tuple("Ready").field(response).finish(),
            Self::Pending(_) => f.debug_tuple("Pending").finish(),
        }
    }
}

/// Lazy sequence of subscription event payloads.
pub type EventStream = BoxStream<'static, EngineResponse>;

/// The external query engine collaborator.
pub trait QueryEngine: Send + Sync + 'static {
    /// Opaque assembled schema handle.
    type SchemaHandle: Send + Sync;

    /// Parsed query representation consumed by `subscribe`.
    type Document: Send;

    /// Assembles the engine-native schema from registry components.
    fn assemble(&self, components: SchemaComponents) -> Result<Self::SchemaHandle, EngineError>;

    /// Parses query text into the engine's document representation.
    fn parse(&self, query: &str) -> Result<Self::Document, GraphQLError>;

    /// Executes one request against the assembled schema.
    fn execute(&self, schema: &Self::SchemaHandle, request: EngineRequest) -> Resolution;

    /// Establishes a subscription from a parsed document.
    fn subscribe(
        &self,
        schema: &Self::SchemaHandle,
        document: Self::Document,
        request: SubscriptionRequest,
    ) -> Result<EventStream, GraphQLError>;

    /// The engine's fixed baseline directive set.
    fn baseline_directives(&self) -> Vec<DirectiveDescriptor> {
        vec![DirectiveDescriptor::skip(), DirectiveDescriptor::include()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_now_synchronous_future_is_ready() {
        let resolution =
            Resolution::resolve_now(async { EngineResponse::data(serde_json::json!({"a": 1})) });
        match resolution {
            Resolution::Ready(response) => {
                assert_eq!(response.data, Some(serde_json::json!({"a": 1})));
            }
            Resolution::Pending(_) => panic!("synchronous future classified as pending"),
        }
    }

    #[tokio::test]
    async fn test_resolve_now_pending_future_is_awaitable() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let resolution = Resolution::resolve_now(async move {
            let value = rx.await.unwrap_or(serde_json::Value::Null);
            EngineResponse::data(value)
        });

        let Resolution::Pending(future) = resolution else {
            panic!("suspending future classified as ready");
        };
        tx.send(serde_json::json!("late")).unwrap();
        let response = future.await;
        assert_eq!(response.data, Some(serde_json::json!("late")));
    }

    #[test]
    fn test_baseline_descriptors() {
        let skip = DirectiveDescriptor::skip();
        assert!(skip.built_in);
        assert!(skip.arguments.contains_key("if"));
        assert_eq!(
            DirectiveDescriptor::include().locations,
            vec![
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ]
        );
    }
}
