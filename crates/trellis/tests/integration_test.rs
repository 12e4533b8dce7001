//! Integration tests for trellis

use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Poll;
use trellis::execution::ExecutionRequest;
use trellis::extensions::{Extension, RequestState, RequestTimer};
use trellis::middleware::{FieldContext, FieldMiddleware, MiddlewareFuture, Next};
use trellis::testing::MockEngine;
use trellis::{
    ArgumentDeclaration, FieldDeclaration, GraphQLError, ObjectDeclaration, PathSegment,
    RequestContext, Schema, TypeRef,
};

fn query_root() -> trellis::TypeDeclaration {
    ObjectDeclaration::new("Query")
        .field(FieldDeclaration::new("hello", TypeRef::named("String")))
        .field(
            FieldDeclaration::new("user", TypeRef::option(TypeRef::named("User")))
                .argument(ArgumentDeclaration::new("id", TypeRef::named("ID"))),
        )
        .field(FieldDeclaration::new(
            "numbers",
            TypeRef::list(TypeRef::named("Int")),
        ))
        .field(FieldDeclaration::new("secret", TypeRef::named("String")))
        .field(FieldDeclaration::new("slow", TypeRef::named("String")))
        .declare()
}

fn user_type() -> trellis::TypeDeclaration {
    ObjectDeclaration::new("User")
        .field(FieldDeclaration::new("id", TypeRef::named("ID")))
        .field(FieldDeclaration::new("name", TypeRef::named("String")))
        .field(FieldDeclaration::new(
            "email",
            TypeRef::option(TypeRef::named("String")),
        ))
        .declare()
}

fn sample_engine() -> MockEngine {
    MockEngine::new()
        .resolver("Query", "hello", |_parent, _args, _ctx| Ok(json!("world")))
        .resolver("Query", "user", |_parent, args, _ctx| {
            let id = args
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("1")
                .to_string();
            Ok(json!({"id": id, "name": "Alice", "email": null}))
        })
        .resolver("Query", "numbers", |_parent, _args, _ctx| {
            Ok(json!([1, 2, 3]))
        })
        .resolver("Query", "secret", |_parent, _args, _ctx| {
            Err(GraphQLError::new("not allowed").with_code("FORBIDDEN"))
        })
}

fn sample_schema(engine: MockEngine) -> Schema<MockEngine> {
    Schema::builder(engine)
        .query(query_root())
        .auxiliary_type(user_type())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_execute_resolves_nested_fields_and_aliases() {
    let schema = sample_schema(sample_engine());

    let result = schema
        .execute(
            ExecutionRequest::new(
                "query GetUser($id: ID!) { greeting: hello user(id: $id) { id name __typename } }",
            )
            .variable("id", json!("42")),
        )
        .await;

    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(json!({
            "greeting": "world",
            "user": {"id": "42", "name": "Alice", "__typename": "User"}
        }))
    );
    assert!(result.extensions.is_none());
}

#[tokio::test]
async fn test_execute_sync_matches_execute_for_synchronous_graphs() {
    let schema = sample_schema(sample_engine());

    let async_result = schema.execute("{ hello numbers }").await;
    let sync_result = schema.execute_sync("{ hello numbers }").unwrap();

    assert_eq!(async_result.data, sync_result.data);
    assert_eq!(sync_result.data, Some(json!({"hello": "world", "numbers": [1, 2, 3]})));
}

#[tokio::test]
async fn test_execute_sync_rejects_suspending_resolvers() {
    let engine = sample_engine().async_resolver("Query", "slow", |_parent, _args, _ctx| {
        Box::pin(async {
            // Suspends exactly once before producing the value.
            let mut first = true;
            futures::future::poll_fn(move |cx| {
                if first {
                    first = false;
                    cx.waker().wake_by_ref();
                    Poll::Pending
                } else {
                    Poll::Ready(())
                }
            })
            .await;
            Ok(json!("eventually"))
        })
    });
    let schema = sample_schema(engine);

    assert!(schema.execute_sync("{ slow }").is_err());

    // The same request still works through the asynchronous entry point.
    let result = schema.execute("{ slow }").await;
    assert_eq!(result.data, Some(json!({"slow": "eventually"})));
}

#[tokio::test]
async fn test_skip_and_include_directives_honor_variables() {
    let schema = sample_schema(sample_engine());

    let result = schema
        .execute(
            ExecutionRequest::new(
                "query Q($hide: Boolean!, $show: Boolean!) { hello @skip(if: $hide) numbers @include(if: $show) }",
            )
            .variable("hide", json!(true))
            .variable("show", json!(false)),
        )
        .await;

    assert!(!result.has_errors());
    assert_eq!(result.data, Some(json!({"hello": null, "numbers": null})));

    // Defaults apply when the variable is not provided.
    let result = schema
        .execute("query Q($hide: Boolean = false) { hello @skip(if: $hide) }")
        .await;
    assert_eq!(result.data, Some(json!({"hello": "world"})));
}

#[tokio::test]
async fn test_resolver_error_yields_partial_result_with_path() {
    let schema = sample_schema(sample_engine());

    let result = schema.execute("{ hello secret }").await;

    assert_eq!(
        result.data,
        Some(json!({"hello": "world", "secret": null}))
    );
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "not allowed");
    assert_eq!(
        result.errors[0].path,
        Some(vec![PathSegment::Field("secret".to_string())])
    );
}

#[tokio::test]
async fn test_unknown_root_field_fails_validation() {
    let schema = sample_schema(sample_engine());

    let result = schema.execute("{ nonsense }").await;

    assert!(result.data.is_none());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("nonsense"));
}

#[tokio::test]
async fn test_operation_selection_by_name() {
    let schema = sample_schema(sample_engine());
    let document = "query First { hello } query Second { numbers }";

    let result = schema
        .execute(ExecutionRequest::new(document).operation_name("Second"))
        .await;
    assert_eq!(result.data, Some(json!({"numbers": [1, 2, 3]})));

    // Multiple operations without a name is an error.
    let result = schema.execute(document).await;
    assert!(result.data.is_none());
    assert!(result.errors[0].message.contains("operation name required"));
}

struct Uppercase;

impl FieldMiddleware for Uppercase {
    fn resolve<'a>(&'a self, ctx: &'a FieldContext, next: Next<'a>) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            let value = next.run(ctx).await?;
            Ok(match value {
                Value::String(text) => Value::String(text.to_uppercase()),
                other => other,
            })
        })
    }
}

struct Gatekeeper;

impl FieldMiddleware for Gatekeeper {
    fn resolve<'a>(&'a self, ctx: &'a FieldContext, next: Next<'a>) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            if ctx.context.get::<Role>().map(|role| role.0) != Some("admin") {
                return Err(GraphQLError::new("login required").with_code("UNAUTHENTICATED"));
            }
            next.run(ctx).await
        })
    }
}

struct Role(&'static str);

#[tokio::test]
async fn test_middleware_transforms_resolved_values() {
    let schema = Schema::builder(sample_engine())
        .query(query_root())
        .auxiliary_type(user_type())
        .middleware(Uppercase)
        .build()
        .unwrap();

    let result = schema.execute("{ hello }").await;
    assert_eq!(result.data, Some(json!({"hello": "WORLD"})));
}

#[tokio::test]
async fn test_middleware_reads_request_context() {
    let schema = Schema::builder(sample_engine())
        .query(query_root())
        .auxiliary_type(user_type())
        .middleware(Gatekeeper)
        .build()
        .unwrap();

    let anonymous = schema.execute("{ hello }").await;
    assert_eq!(anonymous.data, Some(json!({"hello": null})));
    assert_eq!(anonymous.errors[0].message, "login required");

    let admin = schema
        .execute(
            ExecutionRequest::new("{ hello }")
                .context(RequestContext::new().with(Role("admin")).shared()),
        )
        .await;
    assert!(!admin.has_errors());
    assert_eq!(admin.data, Some(json!({"hello": "world"})));
}

#[tokio::test]
async fn test_skip_wins_over_caller_middleware() {
    let schema = Schema::builder(sample_engine())
        .query(query_root())
        .auxiliary_type(user_type())
        .middleware(Gatekeeper)
        .build()
        .unwrap();

    // The directives entry runs first, so a skipped field never reaches
    // the gatekeeper and produces no error.
    let result = schema.execute("{ hello @skip(if: true) }").await;
    assert!(!result.has_errors());
    assert_eq!(result.data, Some(json!({"hello": null})));
}

struct FieldCounter;

impl Extension for FieldCounter {
    fn key(&self) -> &str {
        "executions"
    }

    fn execution_start(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        let count = state.get::<u64>().copied().unwrap_or(0);
        state.insert(count + 1);
        Ok(())
    }

    fn collect(&self, state: &RequestState) -> Option<Value> {
        state.get::<u64>().map(|count| json!(count))
    }
}

struct PoisonPill;

impl Extension for PoisonPill {
    fn key(&self) -> &str {
        "poison"
    }

    fn request_start(&self, _state: &mut RequestState) -> Result<(), GraphQLError> {
        Err(GraphQLError::new("refused"))
    }
}

#[tokio::test]
async fn test_extensions_populate_result_without_cross_request_leaks() {
    let schema = Schema::builder(sample_engine())
        .query(query_root())
        .auxiliary_type(user_type())
        .extension(RequestTimer::new())
        .extension(FieldCounter)
        .build()
        .unwrap();

    let first = schema.execute("{ hello }").await;
    let extensions = first.extensions.unwrap();
    assert!(extensions["timing"].get("request_ms").is_some());
    assert!(extensions["timing"].get("execution_ms").is_some());
    assert_eq!(extensions["executions"], json!(1));

    // A second request starts from fresh extension state.
    let second = schema.execute("{ hello }").await;
    assert_eq!(second.extensions.unwrap()["executions"], json!(1));
}

#[tokio::test]
async fn test_failed_request_start_hook_aborts_before_the_engine() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&invocations);
    let engine = MockEngine::new().resolver("Query", "hello", move |_parent, _args, _ctx| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(json!("world"))
    });
    let schema = Schema::builder(engine)
        .query(query_root())
        .auxiliary_type(user_type())
        .extension(PoisonPill)
        .build()
        .unwrap();

    let result = schema.execute("{ hello }").await;

    assert!(result.data.is_none());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("refused"));
    let extensions = result.errors[0].extensions.as_ref().unwrap();
    assert_eq!(extensions["code"], json!("EXTENSION_ERROR"));
    assert_eq!(invocations.load(Ordering::SeqCst), 0, "engine must not run");
}

struct EndHookCounter {
    ends: Arc<AtomicUsize>,
}

impl Extension for EndHookCounter {
    fn key(&self) -> &str {
        "end_hooks"
    }

    fn request_end(&self, _state: &mut RequestState) -> Result<(), GraphQLError> {
        self.ends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_execute_sync_usage_error_still_ends_the_request() {
    let ends = Arc::new(AtomicUsize::new(0));
    let engine = sample_engine().async_resolver("Query", "slow", |_parent, _args, _ctx| {
        Box::pin(async {
            let mut first = true;
            futures::future::poll_fn(move |cx| {
                if first {
                    first = false;
                    cx.waker().wake_by_ref();
                    Poll::Pending
                } else {
                    Poll::Ready(())
                }
            })
            .await;
            Ok(json!("eventually"))
        })
    });
    let schema = Schema::builder(engine)
        .query(query_root())
        .auxiliary_type(user_type())
        .extension(EndHookCounter {
            ends: Arc::clone(&ends),
        })
        .build()
        .unwrap();

    assert!(schema.execute_sync("{ slow }").is_err());
    assert_eq!(ends.load(Ordering::SeqCst), 1, "request_end must fire");
}

fn subscription_schema() -> Schema<MockEngine> {
    let subscription = ObjectDeclaration::new("Subscription")
        .field(
            FieldDeclaration::new("ticks", TypeRef::named("Int"))
                .argument(ArgumentDeclaration::new("limit", TypeRef::named("Int"))),
        )
        .declare();
    let engine = sample_engine().stream_resolver("Subscription", "ticks", |args, _ctx| {
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(3);
        Ok((1..=limit).map(|n| json!(n)).collect())
    });
    Schema::builder(engine)
        .query(query_root())
        .auxiliary_type(user_type())
        .subscription(subscription)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_subscription_emits_one_result_per_event() {
    let schema = subscription_schema();

    let stream = schema
        .subscribe(
            ExecutionRequest::new("subscription Ticks($limit: Int) { ticks(limit: $limit) }")
                .variable("limit", json!(2)),
        )
        .unwrap();
    let results: Vec<_> = stream.collect().await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].data, Some(json!({"ticks": 1})));
    assert_eq!(results[1].data, Some(json!({"ticks": 2})));
    for result in &results {
        assert!(!result.has_errors());
        assert!(result.extensions.is_none(), "payloads carry no extensions");
    }
}

#[tokio::test]
async fn test_subscribe_rejects_non_subscription_operations() {
    let schema = subscription_schema();

    let err = schema.subscribe("{ hello }").unwrap_err();
    assert!(matches!(err, trellis::SubscriptionError::Rejected(_)));

    let err = schema.subscribe("subscription {").unwrap_err();
    assert!(matches!(err, trellis::SubscriptionError::Parse(_)));
}

#[tokio::test]
async fn test_execute_rejects_subscription_operations() {
    let schema = subscription_schema();

    let result = schema.execute("subscription { ticks }").await;
    assert!(result.data.is_none());
    assert!(result.errors[0].message.contains("subscribe"));
}
