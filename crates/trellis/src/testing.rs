//! A deterministic in-memory query engine for tests and examples.
//!
//! [`MockEngine`] implements the full [`QueryEngine`] contract without a
//! real GraphQL implementation: a minimal recursive-descent parser,
//! registry-backed root-field validation, sequential field execution over
//! registered resolvers with parent property-access fallback, middleware
//! dispatch per field, hook firing per phase and finite subscription
//! streams. It is exactly enough engine to exercise every orchestration
//! contract; it is not a spec-compliant GraphQL executor.

use crate::context::SharedRequestContext;
use crate::engine::{
    EngineRequest, EngineResponse, EventStream, QueryEngine, Resolution, SchemaComponents,
    SubscriptionRequest,
};
use crate::error::{EngineError, GraphQLError, PathSegment};
use crate::extensions::RequestPhase;
use crate::middleware::{
    DirectiveAnnotation, FieldContext, FieldResolver, MiddlewareChain, MiddlewareFuture,
};
use crate::registry::TypeRegistry;
use futures::future::BoxFuture;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

type SyncResolverFn = dyn Fn(Value, HashMap<String, Value>, SharedRequestContext) -> Result<Value, GraphQLError>
    + Send
    + Sync;
type AsyncResolverFn = dyn Fn(
        Value,
        HashMap<String, Value>,
        SharedRequestContext,
    ) -> BoxFuture<'static, Result<Value, GraphQLError>>
    + Send
    + Sync;
type StreamResolverFn = dyn Fn(HashMap<String, Value>, SharedRequestContext) -> Result<Vec<Value>, GraphQLError>
    + Send
    + Sync;

enum Registered {
    Sync(Box<SyncResolverFn>),
    Async(Box<AsyncResolverFn>),
}

#[derive(Clone, Default)]
struct ResolverTable {
    fields: HashMap<(String, String), Arc<Registered>>,
    streams: HashMap<(String, String), Arc<StreamResolverFn>>,
}

/// The deterministic engine.
///
/// # Example
///
/// ```
/// use trellis::testing::MockEngine;
///
/// let engine = MockEngine::new().resolver("Query", "hello", |_parent, _args, _ctx| {
///     Ok(serde_json::json!("world"))
/// });
/// # let _ = engine;
/// ```
#[derive(Clone, Default)]
pub struct MockEngine {
    resolvers: ResolverTable,
}

impl MockEngine {
    /// Creates an engine with no resolvers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a synchronous field resolver.
    pub fn resolver<F>(mut self, parent_type: &str, field: &str, f: F) -> Self
    where
        F: Fn(Value, HashMap<String, Value>, SharedRequestContext) -> Result<Value, GraphQLError>
            + Send
            + Sync
            + 'static,
    {
        self.resolvers.fields.insert(
            (parent_type.to_string(), field.to_string()),
            Arc::new(Registered::Sync(Box::new(f))),
        );
        self
    }

    /// Registers an asynchronous field resolver.
    pub fn async_resolver<F>(mut self, parent_type: &str, field: &str, f: F) -> Self
    where
        F: Fn(
                Value,
                HashMap<String, Value>,
                SharedRequestContext,
            ) -> BoxFuture<'static, Result<Value, GraphQLError>>
            + Send
            + Sync
            + 'static,
    {
        self.resolvers.fields.insert(
            (parent_type.to_string(), field.to_string()),
            Arc::new(Registered::Async(Box::new(f))),
        );
        self
    }

    /// Registers a subscription stream resolver producing a finite event list.
    pub fn stream_resolver<F>(mut self, parent_type: &str, field: &str, f: F) -> Self
    where
        F: Fn(HashMap<String, Value>, SharedRequestContext) -> Result<Vec<Value>, GraphQLError>
            + Send
            + Sync
            + 'static,
    {
        self.resolvers.streams.insert(
            (parent_type.to_string(), field.to_string()),
            Arc::new(f),
        );
        self
    }
}

/// The engine's assembled schema handle.
pub struct MockSchema {
    components: SchemaComponents,
}

impl QueryEngine for MockEngine {
    type SchemaHandle = MockSchema;
    type Document = Document;

    fn assemble(&self, components: SchemaComponents) -> Result<Self::SchemaHandle, EngineError> {
        let query = components
            .registry
            .get(&components.query_type)
            .ok_or_else(|| {
                EngineError::new(format!(
                    "query root type `{}` is not registered",
                    components.query_type
                ))
            })?;
        if query.definition().as_object().is_none() {
            return Err(EngineError::new(format!(
                "query root type `{}` is not an object type",
                components.query_type
            )));
        }
        Ok(MockSchema { components })
    }

    fn parse(&self, query: &str) -> Result<Self::Document, GraphQLError> {
        parse_document(query)
    }

    fn execute(&self, schema: &Self::SchemaHandle, request: EngineRequest) -> Resolution {
        let registry = Arc::clone(&schema.components.registry);
        let query_type = schema.components.query_type.clone();
        let mutation_type = schema.components.mutation_type.clone();
        let resolvers = self.resolvers.clone();

        Resolution::resolve_now(async move {
            let hooks = Arc::clone(&request.hooks);

            hooks.phase_start(RequestPhase::Parse);
            let document = parse_document(&request.query);
            hooks.phase_end(RequestPhase::Parse);
            let document = match document {
                Ok(document) => document,
                Err(error) => return EngineResponse::error(error),
            };

            let operation =
                match select_operation(&document, request.operation_name.as_deref()) {
                    Ok(operation) => operation,
                    Err(error) => return EngineResponse::error(error),
                };
            let root_type = match operation.kind {
                OperationKind::Query => query_type,
                OperationKind::Mutation => match mutation_type {
                    Some(name) => name,
                    None => {
                        return EngineResponse::error(
                            GraphQLError::new("schema has no mutation type")
                                .with_code("GRAPHQL_VALIDATION_FAILED"),
                        )
                    }
                },
                OperationKind::Subscription => {
                    return EngineResponse::error(
                        GraphQLError::new("subscription operations must use `subscribe`")
                            .with_code("BAD_USER_INPUT"),
                    )
                }
            };
            let variables = coerce_variables(operation, &request.variables);

            hooks.phase_start(RequestPhase::Validation);
            let validation_errors = validate_root_fields(&registry, &root_type, &operation.selection);
            hooks.phase_end(RequestPhase::Validation);
            if !validation_errors.is_empty() {
                return EngineResponse {
                    data: None,
                    errors: validation_errors,
                };
            }

            let executor = MockExecutor {
                registry,
                resolvers,
                variables,
                middleware: Arc::clone(&request.middleware),
                context: Arc::clone(&request.context),
                errors: Mutex::new(Vec::new()),
            };
            let root_value = request
                .root
                .clone()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

            hooks.phase_start(RequestPhase::Execution);
            let data = executor
                .execute_selection(&operation.selection, &root_type, root_value, Vec::new())
                .await;
            hooks.phase_end(RequestPhase::Execution);

            EngineResponse {
                data: Some(data),
                errors: executor.errors.into_inner(),
            }
        })
    }

    fn subscribe(
        &self,
        schema: &Self::SchemaHandle,
        document: Self::Document,
        request: SubscriptionRequest,
    ) -> Result<EventStream, GraphQLError> {
        let operation = select_operation(&document, request.operation_name.as_deref())?;
        if operation.kind != OperationKind::Subscription {
            return Err(GraphQLError::new(
                "subscribe requires a subscription operation",
            )
            .with_code("BAD_USER_INPUT"));
        }
        let subscription_type = schema
            .components
            .subscription_type
            .clone()
            .ok_or_else(|| {
                GraphQLError::new("schema has no subscription type")
                    .with_code("GRAPHQL_VALIDATION_FAILED")
            })?;
        let field = operation.selection.first().ok_or_else(|| {
            GraphQLError::new("subscription requires exactly one root field")
                .with_code("GRAPHQL_VALIDATION_FAILED")
        })?;

        let variables = coerce_variables(operation, &request.variables);
        let arguments = resolve_argument_map(&field.arguments, &variables);
        let resolver = self
            .resolvers
            .streams
            .get(&(subscription_type.clone(), field.name.clone()))
            .ok_or_else(|| {
                GraphQLError::new(format!(
                    "no stream resolver registered for {}.{}",
                    subscription_type, field.name
                ))
                .with_code("INTERNAL")
            })?;
        let events = resolver.as_ref()(arguments, Arc::clone(&request.context))?;

        let key = field.response_key().to_string();
        let selection = field.selection.clone();
        let event_type = schema
            .components
            .registry
            .get(&subscription_type)
            .and_then(|concrete| concrete.definition().as_object())
            .and_then(|object| object.fields.get(&field.name))
            .map(|f| f.ty.innermost_name().to_string())
            .unwrap_or_default();

        Ok(futures::stream::iter(events.into_iter().map(move |event| {
            let payload = if selection.is_empty() {
                event
            } else {
                project_selection(&event, &selection, &event_type)
            };
            let mut data = serde_json::Map::new();
            data.insert(key.clone(), payload);
            EngineResponse::data(Value::Object(data))
        }))
        .boxed())
    }
}

struct MockExecutor {
    registry: Arc<TypeRegistry>,
    resolvers: ResolverTable,
    variables: HashMap<String, Value>,
    middleware: Arc<MiddlewareChain>,
    context: SharedRequestContext,
    errors: Mutex<Vec<GraphQLError>>,
}

impl MockExecutor {
    fn execute_selection<'a>(
        &'a self,
        selection: &'a [FieldNode],
        parent_type: &'a str,
        parent: Value,
        path: Vec<PathSegment>,
    ) -> BoxFuture<'a, Value> {
        Box::pin(async move {
            let mut result = serde_json::Map::new();
            for field in selection {
                let key = field.response_key().to_string();
                let mut field_path = path.clone();
                field_path.push(PathSegment::Field(key.clone()));

                if field.name == "__typename" {
                    result.insert(key, Value::String(parent_type.to_string()));
                    continue;
                }

                let arguments = resolve_argument_map(&field.arguments, &self.variables);
                let directives = field
                    .directives
                    .iter()
                    .map(|directive| DirectiveAnnotation {
                        name: directive.name.clone(),
                        arguments: resolve_argument_map(&directive.arguments, &self.variables),
                    })
                    .collect();
                let ctx = FieldContext {
                    parent_type: parent_type.to_string(),
                    field_name: field.name.clone(),
                    path: field_path.clone(),
                    parent: parent.clone(),
                    arguments,
                    directives,
                    context: Arc::clone(&self.context),
                };
                let terminal = TableResolver {
                    table: &self.resolvers,
                };

                let value = match self.middleware.dispatch(&ctx, &terminal).await {
                    Ok(value) => value,
                    Err(error) => {
                        let error = if error.path.is_none() {
                            error.with_path(field_path.clone())
                        } else {
                            error
                        };
                        self.errors.lock().push(error);
                        Value::Null
                    }
                };
                let value = self
                    .complete_value(field, parent_type, value, field_path)
                    .await;
                result.insert(key, value);
            }
            Value::Object(result)
        })
    }

    async fn complete_value(
        &self,
        field: &FieldNode,
        parent_type: &str,
        value: Value,
        path: Vec<PathSegment>,
    ) -> Value {
        if field.selection.is_empty() {
            return value;
        }
        match value {
            Value::Array(items) => {
                let child_type = self.child_type(parent_type, &field.name);
                let mut completed = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    let mut item_path = path.clone();
                    item_path.push(PathSegment::Index(index));
                    let item = match item {
                        Value::Object(_) => {
                            self.execute_selection(&field.selection, &child_type, item, item_path)
                                .await
                        }
                        other => other,
                    };
                    completed.push(item);
                }
                Value::Array(completed)
            }
            Value::Object(_) => {
                let child_type = self.child_type(parent_type, &field.name);
                self.execute_selection(&field.selection, &child_type, value, path)
                    .await
            }
            other => other,
        }
    }

    fn child_type(&self, parent_type: &str, field: &str) -> String {
        self.registry
            .get(parent_type)
            .and_then(|concrete| concrete.definition().as_object())
            .and_then(|object| object.fields.get(field))
            .map(|declaration| declaration.ty.innermost_name().to_string())
            .unwrap_or_default()
    }
}

struct TableResolver<'a> {
    table: &'a ResolverTable,
}

impl FieldResolver for TableResolver<'_> {
    fn resolve_field<'a>(&'a self, ctx: &'a FieldContext) -> MiddlewareFuture<'a> {
        let key = (ctx.parent_type.clone(), ctx.field_name.clone());
        match self.table.fields.get(&key) {
            Some(registered) => match registered.as_ref() {
                Registered::Sync(resolver) => {
                    let result =
                        resolver(ctx.parent.clone(), ctx.arguments.clone(), Arc::clone(&ctx.context));
                    Box::pin(async move { result })
                }
                Registered::Async(resolver) => {
                    resolver(ctx.parent.clone(), ctx.arguments.clone(), Arc::clone(&ctx.context))
                }
            },
            None => {
                // Property-access fallback against the parent value.
                let value = ctx
                    .parent
                    .get(&ctx.field_name)
                    .cloned()
                    .unwrap_or(Value::Null);
                Box::pin(async move { Ok(value) })
            }
        }
    }
}

fn validate_root_fields(
    registry: &TypeRegistry,
    root_type: &str,
    selection: &[FieldNode],
) -> Vec<GraphQLError> {
    let Some(object) = registry
        .get(root_type)
        .and_then(|concrete| concrete.definition().as_object())
    else {
        return vec![GraphQLError::new(format!(
            "root type `{root_type}` is not an object type"
        ))
        .with_code("GRAPHQL_VALIDATION_FAILED")];
    };
    selection
        .iter()
        .filter(|field| field.name != "__typename" && !object.fields.contains_key(&field.name))
        .map(|field| {
            GraphQLError::new(format!(
                "Cannot query field \"{}\" on type \"{}\"",
                field.name, root_type
            ))
            .with_code("GRAPHQL_VALIDATION_FAILED")
        })
        .collect()
}

fn select_operation<'a>(
    document: &'a Document,
    operation_name: Option<&str>,
) -> Result<&'a Operation, GraphQLError> {
    match operation_name {
        Some(name) => document
            .operations
            .iter()
            .find(|operation| operation.name.as_deref() == Some(name))
            .ok_or_else(|| {
                GraphQLError::new(format!("unknown operation `{name}`"))
                    .with_code("BAD_USER_INPUT")
            }),
        None => {
            if document.operations.len() == 1 {
                Ok(&document.operations[0])
            } else {
                Err(GraphQLError::new(
                    "operation name required when the document defines multiple operations",
                )
                .with_code("BAD_USER_INPUT"))
            }
        }
    }
}

fn coerce_variables(
    operation: &Operation,
    provided: &HashMap<String, Value>,
) -> HashMap<String, Value> {
    let mut variables = HashMap::new();
    for definition in &operation.variables {
        if let Some(default) = &definition.default {
            variables.insert(definition.name.clone(), default.clone());
        }
    }
    for (name, value) in provided {
        variables.insert(name.clone(), value.clone());
    }
    variables
}

fn resolve_argument_map(
    arguments: &[(String, ArgValue)],
    variables: &HashMap<String, Value>,
) -> HashMap<String, Value> {
    arguments
        .iter()
        .map(|(name, value)| (name.clone(), resolve_arg_value(value, variables)))
        .collect()
}

fn resolve_arg_value(value: &ArgValue, variables: &HashMap<String, Value>) -> Value {
    match value {
        ArgValue::Literal(literal) => literal.clone(),
        ArgValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
        ArgValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_arg_value(item, variables))
                .collect(),
        ),
        ArgValue::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(name, value)| (name.clone(), resolve_arg_value(value, variables)))
                .collect(),
        ),
    }
}

fn project_selection(event: &Value, selection: &[FieldNode], type_name: &str) -> Value {
    let mut result = serde_json::Map::new();
    for field in selection {
        let key = field.response_key().to_string();
        if field.name == "__typename" {
            result.insert(key, Value::String(type_name.to_string()));
            continue;
        }
        let value = event.get(&field.name).cloned().unwrap_or(Value::Null);
        let value = match value {
            Value::Object(_) if !field.selection.is_empty() => {
                project_selection(&value, &field.selection, "")
            }
            Value::Array(items) if !field.selection.is_empty() => Value::Array(
                items
                    .iter()
                    .map(|item| project_selection(item, &field.selection, ""))
                    .collect(),
            ),
            other => other,
        };
        result.insert(key, value);
    }
    Value::Object(result)
}

/// A parsed query document.
#[derive(Debug, Clone)]
pub struct Document {
    operations: Vec<Operation>,
}

#[derive(Debug, Clone)]
struct Operation {
    kind: OperationKind,
    name: Option<String>,
    variables: Vec<VariableDefinition>,
    selection: Vec<FieldNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

#[derive(Debug, Clone)]
struct VariableDefinition {
    name: String,
    #[allow(dead_code)]
    ty: String,
    default: Option<Value>,
}

#[derive(Debug, Clone)]
struct FieldNode {
    alias: Option<String>,
    name: String,
    arguments: Vec<(String, ArgValue)>,
    directives: Vec<DirectiveNode>,
    selection: Vec<FieldNode>,
}

impl FieldNode {
    fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
struct DirectiveNode {
    name: String,
    arguments: Vec<(String, ArgValue)>,
}

#[derive(Debug, Clone)]
enum ArgValue {
    Literal(Value),
    Variable(String),
    List(Vec<ArgValue>),
    Object(Vec<(String, ArgValue)>),
}

fn parse_document(input: &str) -> Result<Document, GraphQLError> {
    let mut parser = Parser::new(input);
    let mut operations = Vec::new();
    parser.skip_ignored();
    while !parser.at_end() {
        operations.push(parser.parse_operation()?);
        parser.skip_ignored();
    }
    if operations.is_empty() {
        return Err(parse_error("document contains no operations"));
    }
    Ok(Document { operations })
}

fn parse_error(message: impl Into<String>) -> GraphQLError {
    GraphQLError::new(message).with_code("GRAPHQL_PARSE_FAILED")
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    // Whitespace, commas and `#` comments are all ignored tokens.
    fn skip_ignored(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ',' {
                self.pos += 1;
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    self.pos += 1;
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), GraphQLError> {
        self.skip_ignored();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(parse_error(format!("expected `{expected}`, found `{c}`"))),
            None => Err(parse_error(format!(
                "expected `{expected}`, found end of input"
            ))),
        }
    }

    fn at_name(&mut self) -> bool {
        self.skip_ignored();
        matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == '_')
    }

    fn parse_name(&mut self) -> Result<String, GraphQLError> {
        self.skip_ignored();
        let mut name = String::new();
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                name.push(c);
                self.pos += 1;
            }
            Some(c) => return Err(parse_error(format!("expected a name, found `{c}`"))),
            None => return Err(parse_error("expected a name, found end of input")),
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn parse_operation(&mut self) -> Result<Operation, GraphQLError> {
        self.skip_ignored();
        if self.peek() == Some('{') {
            return Ok(Operation {
                kind: OperationKind::Query,
                name: None,
                variables: Vec::new(),
                selection: self.parse_selection_set()?,
            });
        }

        let keyword = self.parse_name()?;
        let kind = match keyword.as_str() {
            "query" => OperationKind::Query,
            "mutation" => OperationKind::Mutation,
            "subscription" => OperationKind::Subscription,
            other => return Err(parse_error(format!("unexpected token `{other}`"))),
        };
        let name = if self.at_name() {
            Some(self.parse_name()?)
        } else {
            None
        };
        self.skip_ignored();
        let variables = if self.peek() == Some('(') {
            self.parse_variable_definitions()?
        } else {
            Vec::new()
        };
        Ok(Operation {
            kind,
            name,
            variables,
            selection: self.parse_selection_set()?,
        })
    }

    fn parse_variable_definitions(&mut self) -> Result<Vec<VariableDefinition>, GraphQLError> {
        self.expect('(')?;
        let mut definitions = Vec::new();
        loop {
            self.skip_ignored();
            if self.peek() == Some(')') {
                self.pos += 1;
                break;
            }
            self.expect('$')?;
            let name = self.parse_name()?;
            self.expect(':')?;
            let ty = self.parse_type_text()?;
            self.skip_ignored();
            let default = if self.peek() == Some('=') {
                self.pos += 1;
                match self.parse_value()? {
                    ArgValue::Literal(value) => Some(value),
                    _ => {
                        return Err(parse_error(
                            "variable defaults must be constant values",
                        ))
                    }
                }
            } else {
                None
            };
            definitions.push(VariableDefinition { name, ty, default });
        }
        Ok(definitions)
    }

    fn parse_type_text(&mut self) -> Result<String, GraphQLError> {
        self.skip_ignored();
        let mut text = String::new();
        if self.peek() == Some('[') {
            self.pos += 1;
            text.push('[');
            text.push_str(&self.parse_type_text()?);
            self.expect(']')?;
            text.push(']');
        } else {
            text.push_str(&self.parse_name()?);
        }
        if self.peek() == Some('!') {
            self.pos += 1;
            text.push('!');
        }
        Ok(text)
    }

    fn parse_selection_set(&mut self) -> Result<Vec<FieldNode>, GraphQLError> {
        self.expect('{')?;
        let mut fields = Vec::new();
        loop {
            self.skip_ignored();
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => fields.push(self.parse_field()?),
                None => return Err(parse_error("unterminated selection set")),
            }
        }
        if fields.is_empty() {
            return Err(parse_error("selection set must not be empty"));
        }
        Ok(fields)
    }

    fn parse_field(&mut self) -> Result<FieldNode, GraphQLError> {
        let first = self.parse_name()?;
        self.skip_ignored();
        let (alias, name) = if self.peek() == Some(':') {
            self.pos += 1;
            (Some(first), self.parse_name()?)
        } else {
            (None, first)
        };
        self.skip_ignored();
        let arguments = if self.peek() == Some('(') {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        let mut directives = Vec::new();
        loop {
            self.skip_ignored();
            if self.peek() != Some('@') {
                break;
            }
            self.pos += 1;
            let directive_name = self.parse_name()?;
            self.skip_ignored();
            let directive_arguments = if self.peek() == Some('(') {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            directives.push(DirectiveNode {
                name: directive_name,
                arguments: directive_arguments,
            });
        }
        self.skip_ignored();
        let selection = if self.peek() == Some('{') {
            self.parse_selection_set()?
        } else {
            Vec::new()
        };
        Ok(FieldNode {
            alias,
            name,
            arguments,
            directives,
            selection,
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<(String, ArgValue)>, GraphQLError> {
        self.expect('(')?;
        let mut arguments = Vec::new();
        loop {
            self.skip_ignored();
            if self.peek() == Some(')') {
                self.pos += 1;
                break;
            }
            let name = self.parse_name()?;
            self.expect(':')?;
            arguments.push((name, self.parse_value()?));
        }
        Ok(arguments)
    }

    fn parse_value(&mut self) -> Result<ArgValue, GraphQLError> {
        self.skip_ignored();
        match self.peek() {
            Some('$') => {
                self.pos += 1;
                Ok(ArgValue::Variable(self.parse_name()?))
            }
            Some('"') => self.parse_string(),
            Some('[') => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_ignored();
                    if self.peek() == Some(']') {
                        self.pos += 1;
                        break;
                    }
                    items.push(self.parse_value()?);
                }
                Ok(ArgValue::List(items))
            }
            Some('{') => {
                self.pos += 1;
                let mut entries = Vec::new();
                loop {
                    self.skip_ignored();
                    if self.peek() == Some('}') {
                        self.pos += 1;
                        break;
                    }
                    let name = self.parse_name()?;
                    self.expect(':')?;
                    entries.push((name, self.parse_value()?));
                }
                Ok(ArgValue::Object(entries))
            }
            Some(c) if c.is_ascii_digit() || c == '-' => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.parse_name()?;
                Ok(ArgValue::Literal(match name.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::Null,
                    // Enum values travel as strings.
                    _ => Value::String(name),
                }))
            }
            Some(c) => Err(parse_error(format!("unexpected `{c}` in value position"))),
            None => Err(parse_error("expected a value, found end of input")),
        }
    }

    fn parse_string(&mut self) -> Result<ArgValue, GraphQLError> {
        self.expect('"')?;
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c) => text.push(c),
                    None => return Err(parse_error("unterminated string")),
                },
                Some(c) => text.push(c),
                None => return Err(parse_error("unterminated string")),
            }
        }
        Ok(ArgValue::Literal(Value::String(text)))
    }

    fn parse_number(&mut self) -> Result<ArgValue, GraphQLError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                text.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        let literal = if text.contains('.') || text.contains('e') || text.contains('E') {
            text.parse::<f64>()
                .ok()
                .and_then(|f| serde_json::Number::from_f64(f))
                .map(Value::Number)
        } else {
            text.parse::<i64>().ok().map(Value::from)
        };
        match literal {
            Some(value) => Ok(ArgValue::Literal(value)),
            None => Err(parse_error(format!("malformed number `{text}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anonymous_operation() {
        let document = parse_document("{ hello world }").unwrap();
        assert_eq!(document.operations.len(), 1);
        let operation = &document.operations[0];
        assert_eq!(operation.kind, OperationKind::Query);
        assert!(operation.name.is_none());
        assert_eq!(operation.selection.len(), 2);
        assert_eq!(operation.selection[0].name, "hello");
    }

    #[test]
    fn test_parse_named_operations_with_variables() {
        let document = parse_document(
            "query GetUser($id: ID!, $verbose: Boolean = false) { user(id: $id) { id name } }\n\
             mutation Touch { touch }",
        )
        .unwrap();
        assert_eq!(document.operations.len(), 2);

        let query = &document.operations[0];
        assert_eq!(query.name.as_deref(), Some("GetUser"));
        assert_eq!(query.variables.len(), 2);
        assert_eq!(query.variables[0].name, "id");
        assert_eq!(query.variables[1].default, Some(Value::Bool(false)));

        let user = &query.selection[0];
        assert_eq!(user.name, "user");
        assert!(matches!(&user.arguments[0].1, ArgValue::Variable(name) if name == "id"));
        assert_eq!(user.selection.len(), 2);

        assert_eq!(document.operations[1].kind, OperationKind::Mutation);
    }

    #[test]
    fn test_parse_aliases_directives_and_literals() {
        let document = parse_document(
            "{ loud: greeting(names: [\"a\", \"b\"], mode: LOUD, opts: {depth: 2}) @skip(if: $q) }",
        )
        .unwrap();
        let field = &document.operations[0].selection[0];
        assert_eq!(field.response_key(), "loud");
        assert_eq!(field.name, "greeting");
        assert_eq!(field.arguments.len(), 3);
        assert!(matches!(&field.arguments[1].1, ArgValue::Literal(Value::String(s)) if s == "LOUD"));
        assert_eq!(field.directives.len(), 1);
        assert_eq!(field.directives[0].name, "skip");
    }

    #[test]
    fn test_parse_comments_and_commas_ignored() {
        let document = parse_document("# leading comment\n{ a, b # trailing\n c }").unwrap();
        assert_eq!(document.operations[0].selection.len(), 3);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_document("").is_err());
        assert!(parse_document("{").is_err());
        assert!(parse_document("{ }").is_err());
        assert!(parse_document("frag { a }").is_err());
        let err = parse_document("{ a(x: @) }").unwrap_err();
        assert_eq!(
            err.extensions.unwrap()["code"],
            serde_json::json!("GRAPHQL_PARSE_FAILED")
        );
    }

    #[test]
    fn test_resolve_arg_values() {
        let mut variables = HashMap::new();
        variables.insert("flag".to_string(), Value::Bool(true));
        let value = resolve_arg_value(
            &ArgValue::List(vec![
                ArgValue::Variable("flag".to_string()),
                ArgValue::Variable("missing".to_string()),
                ArgValue::Literal(serde_json::json!(1)),
            ]),
            &variables,
        );
        assert_eq!(value, serde_json::json!([true, null, 1]));
    }
}
