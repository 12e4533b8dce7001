//! The schema aggregate and its execution façade.
//!
//! [`Schema`] composes the type registry, the middleware chain, the
//! extensions runner and the engine's opaque schema handle, and exposes
//! the three uniform entry points: [`Schema::execute`],
//! [`Schema::execute_sync`] and [`Schema::subscribe`].

use crate::engine::{
    DirectiveDescriptor, EngineRequest, EngineResponse, QueryEngine, Resolution, SchemaComponents,
    SubscriptionRequest,
};
use crate::error::{SchemaError, SubscriptionError, SyncExecutionError};
use crate::execution::{ExecutionRequest, ExecutionResult, SubscriptionStream};
use crate::extensions::{Extension, ExtensionsRunner, RequestPhase, RequestScope};
use crate::middleware::{FieldMiddleware, MiddlewareChain};
use crate::printer;
use crate::registry::{RegistryBuilder, TypeRegistry};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use trellis_types::{DirectiveDeclaration, TypeDeclaration};

/// A constructed, immutable schema.
///
/// Everything the schema holds is read-only after construction, so one
/// instance serves concurrent requests without locking.
pub struct Schema<E: QueryEngine> {
    engine: E,
    handle: E::SchemaHandle,
    components: SchemaComponents,
    middleware: Arc<MiddlewareChain>,
    extensions: ExtensionsRunner,
}

impl<E: QueryEngine> Schema<E> {
    /// Starts building a schema on top of an engine.
    pub fn builder(engine: E) -> SchemaBuilder<E> {
        SchemaBuilder {
            engine,
            query: None,
            mutation: None,
            subscription: None,
            directives: Vec::new(),
            types: Vec::new(),
            extensions: Vec::new(),
            middleware: Vec::new(),
        }
    }

    /// Looks up a registered type definition by name.
    pub fn get_type_by_name(&self, name: &str) -> Option<&TypeDeclaration> {
        self.components
            .registry
            .get(name)
            .map(|concrete| concrete.definition())
    }

    /// Returns the type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.components.registry
    }

    /// Returns the merged directive set, baseline included.
    pub fn directives(&self) -> &[DirectiveDescriptor] {
        &self.components.directives
    }

    /// Returns the query root type name.
    pub fn query_type(&self) -> &str {
        &self.components.query_type
    }

    /// Returns the mutation root type name, if configured.
    pub fn mutation_type(&self) -> Option<&str> {
        self.components.mutation_type.as_deref()
    }

    /// Returns the subscription root type name, if configured.
    pub fn subscription_type(&self) -> Option<&str> {
        self.components.subscription_type.as_deref()
    }

    /// Executes a request, awaiting asynchronous resolution if needed.
    ///
    /// Never fails outright: engine and extension hook errors are folded
    /// into the result's `errors` list.
    pub async fn execute(&self, request: impl Into<ExecutionRequest>) -> ExecutionResult {
        let request = request.into();
        debug!(operation = ?request.operation_name, "executing request");

        let (scope, outcome) = self.begin(request);
        let response = match outcome {
            RequestOutcome::Aborted => EngineResponse::default(),
            RequestOutcome::Started(Resolution::Ready(response)) => response,
            RequestOutcome::Started(Resolution::Pending(future)) => future.await,
        };
        self.finish(&scope, response)
    }

    /// Executes a request that must complete without suspending.
    ///
    /// Returns [`SyncExecutionError`] when the resolver graph turns out
    /// to require asynchronous resolution; a silently-null result is
    /// never produced. Even on that error the request end hooks still
    /// fire, so extensions always see paired start/end calls.
    pub fn execute_sync(
        &self,
        request: impl Into<ExecutionRequest>,
    ) -> Result<ExecutionResult, SyncExecutionError> {
        let request = request.into();
        debug!(operation = ?request.operation_name, "executing request synchronously");

        let (scope, outcome) = self.begin(request);
        let response = match outcome {
            RequestOutcome::Aborted => EngineResponse::default(),
            RequestOutcome::Started(Resolution::Ready(response)) => response,
            RequestOutcome::Started(Resolution::Pending(_)) => {
                scope.phase_end(RequestPhase::Request);
                return Err(SyncExecutionError);
            }
        };
        Ok(self.finish(&scope, response))
    }

    /// Establishes a subscription, returning one result per event.
    ///
    /// Subscriptions bypass the middleware chain and the extensions
    /// runner: the engine receives neither, and payloads carry no
    /// `extensions`. The stream is not restartable; re-subscribing
    /// requires a fresh call.
    pub fn subscribe(
        &self,
        request: impl Into<ExecutionRequest>,
    ) -> Result<SubscriptionStream, SubscriptionError> {
        let request = request.into();
        debug!(operation = ?request.operation_name, "establishing subscription");

        let document = self
            .engine
            .parse(&request.query)
            .map_err(SubscriptionError::Parse)?;
        let events = self
            .engine
            .subscribe(
                &self.handle,
                document,
                SubscriptionRequest {
                    variables: request.variables,
                    operation_name: request.operation_name,
                    root: request.root,
                    context: request.context,
                },
            )
            .map_err(SubscriptionError::Rejected)?;
        Ok(SubscriptionStream::new(events))
    }

    /// Prints the schema as SDL.
    pub fn to_sdl(&self) -> String {
        printer::print_schema(self)
    }

    fn begin(&self, request: ExecutionRequest) -> (Arc<RequestScope>, RequestOutcome) {
        let scope = Arc::new(
            self.extensions
                .begin(&request.query, request.operation_name.as_deref()),
        );
        scope.phase_start(RequestPhase::Request);
        if scope.has_hook_errors() {
            // A failed request-start hook aborts before the engine runs.
            return (scope, RequestOutcome::Aborted);
        }

        let engine_request = EngineRequest {
            query: request.query,
            variables: request.variables,
            operation_name: request.operation_name,
            root: request.root,
            context: request.context,
            middleware: Arc::clone(&self.middleware),
            hooks: Arc::clone(&scope),
        };
        let resolution = self.engine.execute(&self.handle, engine_request);
        (scope, RequestOutcome::Started(resolution))
    }

    fn finish(&self, scope: &RequestScope, mut response: EngineResponse) -> ExecutionResult {
        scope.phase_end(RequestPhase::Request);
        response.errors.extend(scope.take_hook_errors());
        let extensions = scope.collect_results();
        ExecutionResult::from_engine(response, extensions)
    }
}

impl<E: QueryEngine> std::fmt::Debug for Schema<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("query_type", &self.components.query_type)
            .field("types", &self.components.registry.len())
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

enum RequestOutcome {
    Aborted,
    Started(Resolution),
}

/// Builder for [`Schema`].
pub struct SchemaBuilder<E: QueryEngine> {
    engine: E,
    query: Option<TypeDeclaration>,
    mutation: Option<TypeDeclaration>,
    subscription: Option<TypeDeclaration>,
    directives: Vec<DirectiveDeclaration>,
    types: Vec<TypeDeclaration>,
    extensions: Vec<Arc<dyn Extension>>,
    middleware: Vec<Arc<dyn FieldMiddleware>>,
}

impl<E: QueryEngine> SchemaBuilder<E> {
    /// Sets the query root type (required).
    pub fn query(mut self, declaration: TypeDeclaration) -> Self {
        self.query = Some(declaration);
        self
    }

    /// Sets the mutation root type.
    pub fn mutation(mut self, declaration: TypeDeclaration) -> Self {
        self.mutation = Some(declaration);
        self
    }

    /// Sets the subscription root type.
    pub fn subscription(mut self, declaration: TypeDeclaration) -> Self {
        self.subscription = Some(declaration);
        self
    }

    /// Adds a directive declaration.
    pub fn directive(mut self, declaration: DirectiveDeclaration) -> Self {
        self.directives.push(declaration);
        self
    }

    /// Adds an auxiliary type not reachable from the roots.
    pub fn auxiliary_type(mut self, declaration: TypeDeclaration) -> Self {
        self.types.push(declaration);
        self
    }

    /// Appends an extension.
    pub fn extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Appends a field middleware after the mandatory directives entry.
    pub fn middleware(mut self, middleware: impl FieldMiddleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Builds the schema.
    ///
    /// Configuration errors are returned here, synchronously; a failed
    /// build leaves nothing observable behind.
    pub fn build(self) -> Result<Schema<E>, SchemaError> {
        let query = self.query.ok_or(SchemaError::MissingQueryRoot)?;

        let mut registry = RegistryBuilder::new();
        registry.register(&query)?;
        if let Some(mutation) = &self.mutation {
            registry.register(mutation)?;
        }
        if let Some(subscription) = &self.subscription {
            registry.register(subscription)?;
        }
        for declaration in &self.types {
            registry.register(declaration)?;
        }

        let mut directives = self.engine.baseline_directives();
        let mut names: HashSet<String> = directives
            .iter()
            .map(|descriptor| descriptor.name.clone())
            .collect();
        for declaration in &self.directives {
            registry.register_directive_arguments(declaration)?;
            if !names.insert(declaration.name.clone()) {
                return Err(SchemaError::DuplicateDirective {
                    name: declaration.name.clone(),
                });
            }
            directives.push(DirectiveDescriptor::from_declaration(declaration));
        }

        let registry = registry.finish()?;
        let components = SchemaComponents {
            registry: Arc::clone(&registry),
            query_type: query.name().to_string(),
            mutation_type: self.mutation.as_ref().map(|d| d.name().to_string()),
            subscription_type: self.subscription.as_ref().map(|d| d.name().to_string()),
            directives,
        };
        let handle = self.engine.assemble(components.clone())?;
        let middleware = Arc::new(MiddlewareChain::new(
            &components.directives,
            self.middleware,
        ));
        let extensions = ExtensionsRunner::new(self.extensions);

        info!(
            types = registry.len(),
            middleware = middleware.len(),
            "schema constructed"
        );
        Ok(Schema {
            engine: self.engine,
            handle,
            components,
            middleware,
            extensions,
        })
    }
}
