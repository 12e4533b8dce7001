//! Request and result types for the execution façade.

use crate::context::{RequestContext, SharedRequestContext};
use crate::engine::{EngineResponse, EventStream};
use crate::error::GraphQLError;
use futures::Stream;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};

/// One request against the execution façade.
///
/// # Example
///
/// ```
/// use trellis::execution::ExecutionRequest;
///
/// let request = ExecutionRequest::new("query Hello($loud: Boolean!) { hello }")
///     .variable("loud", serde_json::json!(true))
///     .operation_name("Hello");
/// assert_eq!(request.operation_name.as_deref(), Some("Hello"));
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub query: String,
    pub variables: HashMap<String, Value>,
    pub operation_name: Option<String>,
    pub root: Option<Value>,
    pub context: SharedRequestContext,
}

impl ExecutionRequest {
    /// Creates a request from query text.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: HashMap::new(),
            operation_name: None,
            root: None,
            context: RequestContext::new().shared(),
        }
    }

    /// Adds one variable.
    pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Replaces the variable map.
    pub fn variables(mut self, variables: HashMap<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// Selects the operation to run.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Sets the root value.
    pub fn root(mut self, root: Value) -> Self {
        self.root = Some(root);
        self
    }

    /// Sets the caller context.
    pub fn context(mut self, context: SharedRequestContext) -> Self {
        self.context = context;
        self
    }
}

impl From<&str> for ExecutionRequest {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for ExecutionRequest {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

/// The normalized response shape shared by all three entry points.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Resolved data; null on top-level failure.
    pub data: Option<Value>,

    /// Execution errors, in the order they were recorded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,

    /// Extension results keyed by extension identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<IndexMap<String, Value>>,
}

impl ExecutionResult {
    pub(crate) fn from_engine(
        response: EngineResponse,
        extensions: Option<IndexMap<String, Value>>,
    ) -> Self {
        Self {
            data: response.data,
            errors: response.errors,
            extensions,
        }
    }

    /// Returns true if any error was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Lazy stream of subscription payloads, one per event.
///
/// Not restartable: once consumed, a new subscription requires a fresh
/// `subscribe` call. Payloads never carry `extensions`.
pub struct SubscriptionStream {
    inner: EventStream,
}

impl SubscriptionStream {
    pub(crate) fn new(inner: EventStream) -> Self {
        Self { inner }
    }
}

impl Stream for SubscriptionStream {
    type Item = ExecutionResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|event| event.map(|response| ExecutionResult::from_engine(response, None)))
    }
}

impl std::fmt::Debug for SubscriptionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionStream").finish_non_exhaustive()
    }
}
