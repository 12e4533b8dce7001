//! Field-resolution middleware.
//!
//! The schema owns an ordered [`MiddlewareChain`] that the engine runs
//! around every field resolution. The first entry is always the
//! [`DirectivesMiddleware`]; directive skip decisions are taken before any
//! caller-supplied middleware or the real resolver sees the field.

use crate::context::SharedRequestContext;
use crate::engine::DirectiveDescriptor;
use crate::error::{GraphQLError, PathSegment};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by middleware and terminal resolvers.
pub type MiddlewareFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Value, GraphQLError>> + Send + 'a>>;

/// The field being resolved, as seen by middleware.
#[derive(Debug, Clone)]
pub struct FieldContext {
    /// Name of the type the field belongs to.
    pub parent_type: String,

    /// The field name.
    pub field_name: String,

    /// Response path to this field.
    pub path: Vec<PathSegment>,

    /// The parent (source) value the field is resolved against.
    pub parent: Value,

    /// Field arguments, variables already substituted by the engine.
    pub arguments: HashMap<String, Value>,

    /// Directive annotations on the field, arguments resolved.
    pub directives: Vec<DirectiveAnnotation>,

    /// Caller request context.
    pub context: SharedRequestContext,
}

/// A directive applied to a query field, with resolved argument values.
#[derive(Debug, Clone)]
pub struct DirectiveAnnotation {
    pub name: String,
    pub arguments: HashMap<String, Value>,
}

impl DirectiveAnnotation {
    /// Creates an annotation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
        }
    }

    /// Adds a resolved argument value.
    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }
}

/// The terminal end of a chain: the engine's real resolver for a field.
pub trait FieldResolver: Send + Sync {
    /// Resolves the field without further interception.
    fn resolve_field<'a>(&'a self, ctx: &'a FieldContext) -> MiddlewareFuture<'a>;
}

/// An interceptor around field resolution.
///
/// Implementations may short-circuit by not calling `next`, or transform
/// the value produced downstream.
pub trait FieldMiddleware: Send + Sync {
    /// Runs this middleware for one field resolution.
    fn resolve<'a>(&'a self, ctx: &'a FieldContext, next: Next<'a>) -> MiddlewareFuture<'a>;
}

/// Continuation handed to each middleware.
pub struct Next<'a> {
    rest: &'a [Arc<dyn FieldMiddleware>],
    terminal: &'a dyn FieldResolver,
}

impl<'a> Next<'a> {
    /// Runs the remaining chain, ending at the terminal resolver.
    pub fn run(self, ctx: &'a FieldContext) -> MiddlewareFuture<'a> {
        match self.rest.split_first() {
            Some((head, rest)) => head.resolve(
                ctx,
                Next {
                    rest,
                    terminal: self.terminal,
                },
            ),
            None => self.terminal.resolve_field(ctx),
        }
    }
}

/// The schema's ordered middleware list.
///
/// Entry order is `[DirectivesMiddleware, caller middleware...]`; the
/// engine calls [`MiddlewareChain::dispatch`] once per field.
pub struct MiddlewareChain {
    entries: Vec<Arc<dyn FieldMiddleware>>,
}

impl MiddlewareChain {
    /// Builds the chain from the schema's directives plus caller entries.
    pub(crate) fn new(
        directives: &[DirectiveDescriptor],
        caller: Vec<Arc<dyn FieldMiddleware>>,
    ) -> Self {
        let mut entries: Vec<Arc<dyn FieldMiddleware>> =
            vec![Arc::new(DirectivesMiddleware::new(directives))];
        entries.extend(caller);
        Self { entries }
    }

    /// Runs the whole chain for one field resolution.
    pub fn dispatch<'a>(
        &'a self,
        ctx: &'a FieldContext,
        resolve: &'a dyn FieldResolver,
    ) -> MiddlewareFuture<'a> {
        Next {
            rest: &self.entries,
            terminal: resolve,
        }
        .run(ctx)
    }

    /// Returns the number of entries, directives middleware included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the directives entry is mandatory.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Mandatory first middleware: evaluates `@skip` / `@include` conditions.
pub struct DirectivesMiddleware {
    declared: HashSet<String>,
}

impl DirectivesMiddleware {
    /// Creates the middleware from the schema's merged directive set.
    pub(crate) fn new(directives: &[DirectiveDescriptor]) -> Self {
        Self {
            declared: directives.iter().map(|d| d.name.clone()).collect(),
        }
    }

    fn condition(annotation: &DirectiveAnnotation) -> Result<bool, GraphQLError> {
        match annotation.arguments.get("if") {
            Some(Value::Bool(condition)) => Ok(*condition),
            Some(_) | None => Err(GraphQLError::new(format!(
                "directive @{} requires a boolean `if` argument",
                annotation.name
            ))
            .with_code("BAD_USER_INPUT")),
        }
    }
}

impl FieldMiddleware for DirectivesMiddleware {
    fn resolve<'a>(&'a self, ctx: &'a FieldContext, next: Next<'a>) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            for annotation in &ctx.directives {
                match annotation.name.as_str() {
                    "skip" => {
                        if Self::condition(annotation)? {
                            return Ok(Value::Null);
                        }
                    }
                    "include" => {
                        if !Self::condition(annotation)? {
                            return Ok(Value::Null);
                        }
                    }
                    name => {
                        // Declared custom directives are the engine's concern.
                        if !self.declared.contains(name) {
                            return Err(GraphQLError::new(format!(
                                "unknown directive @{name}"
                            ))
                            .with_code("BAD_USER_INPUT"));
                        }
                    }
                }
            }
            next.run(ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use parking_lot::Mutex;

    struct StaticResolver(Value);

    impl FieldResolver for StaticResolver {
        fn resolve_field<'a>(&'a self, _ctx: &'a FieldContext) -> MiddlewareFuture<'a> {
            let value = self.0.clone();
            Box::pin(async move { Ok(value) })
        }
    }

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl FieldMiddleware for Recorder {
        fn resolve<'a>(&'a self, ctx: &'a FieldContext, next: Next<'a>) -> MiddlewareFuture<'a> {
            Box::pin(async move {
                self.log.lock().push(self.label);
                next.run(ctx).await
            })
        }
    }

    fn field_ctx(directives: Vec<DirectiveAnnotation>) -> FieldContext {
        FieldContext {
            parent_type: "Query".to_string(),
            field_name: "hello".to_string(),
            path: vec![PathSegment::Field("hello".to_string())],
            parent: Value::Null,
            arguments: HashMap::new(),
            directives,
            context: RequestContext::new().shared(),
        }
    }

    fn chain_with(caller: Vec<Arc<dyn FieldMiddleware>>) -> MiddlewareChain {
        MiddlewareChain::new(
            &[
                DirectiveDescriptor::skip(),
                DirectiveDescriptor::include(),
            ],
            caller,
        )
    }

    #[tokio::test]
    async fn test_caller_middleware_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain_with(vec![
            Arc::new(Recorder {
                label: "first",
                log: Arc::clone(&log),
            }),
            Arc::new(Recorder {
                label: "second",
                log: Arc::clone(&log),
            }),
        ]);

        let ctx = field_ctx(Vec::new());
        let resolver = StaticResolver(serde_json::json!("world"));
        let value = chain.dispatch(&ctx, &resolver).await.unwrap();

        assert_eq!(value, serde_json::json!("world"));
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_skip_short_circuits_before_caller_middleware() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain_with(vec![Arc::new(Recorder {
            label: "caller",
            log: Arc::clone(&log),
        })]);

        let ctx = field_ctx(vec![
            DirectiveAnnotation::new("skip").with_argument("if", Value::Bool(true)),
        ]);
        let resolver = StaticResolver(serde_json::json!("never"));
        let value = chain.dispatch(&ctx, &resolver).await.unwrap();

        assert_eq!(value, Value::Null);
        assert!(log.lock().is_empty(), "caller middleware must not run");
    }

    #[tokio::test]
    async fn test_include_false_skips_field() {
        let chain = chain_with(Vec::new());
        let ctx = field_ctx(vec![
            DirectiveAnnotation::new("include").with_argument("if", Value::Bool(false)),
        ]);
        let resolver = StaticResolver(serde_json::json!(42));
        let value = chain.dispatch(&ctx, &resolver).await.unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_non_boolean_condition_is_an_error() {
        let chain = chain_with(Vec::new());
        let ctx = field_ctx(vec![
            DirectiveAnnotation::new("skip").with_argument("if", serde_json::json!("yes")),
        ]);
        let resolver = StaticResolver(Value::Null);
        let err = chain.dispatch(&ctx, &resolver).await.unwrap_err();
        assert!(err.message.contains("boolean `if`"));
    }

    #[tokio::test]
    async fn test_undeclared_directive_is_an_error() {
        let chain = chain_with(Vec::new());
        let ctx = field_ctx(vec![DirectiveAnnotation::new("mystery")]);
        let resolver = StaticResolver(Value::Null);
        let err = chain.dispatch(&ctx, &resolver).await.unwrap_err();
        assert!(err.message.contains("unknown directive @mystery"));
    }
}
