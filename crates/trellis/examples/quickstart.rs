//! Builds a small schema over the in-memory engine and runs a few requests.
//!
//! Run with `RUST_LOG=trellis=debug cargo run --example quickstart`.

use futures::StreamExt;
use serde_json::json;
use trellis::execution::ExecutionRequest;
use trellis::extensions::RequestTimer;
use trellis::middleware::{FieldContext, FieldMiddleware, MiddlewareFuture, Next};
use trellis::testing::MockEngine;
use trellis::{ArgumentDeclaration, FieldDeclaration, ObjectDeclaration, Schema, TypeRef};

struct Shout;

impl FieldMiddleware for Shout {
    fn resolve<'a>(&'a self, ctx: &'a FieldContext, next: Next<'a>) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            let value = next.run(ctx).await?;
            Ok(match value {
                serde_json::Value::String(text) => serde_json::Value::String(text.to_uppercase()),
                other => other,
            })
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trellis=info".parse()?),
        )
        .compact()
        .init();

    let query = ObjectDeclaration::new("Query")
        .field(
            FieldDeclaration::new("greet", TypeRef::named("String"))
                .argument(ArgumentDeclaration::new("name", TypeRef::named("String"))),
        )
        .declare();
    let subscription = ObjectDeclaration::new("Subscription")
        .field(FieldDeclaration::new("countdown", TypeRef::named("Int")))
        .declare();

    let engine = MockEngine::new()
        .resolver("Query", "greet", |_parent, args, _ctx| {
            let name = args
                .get("name")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("world");
            Ok(json!(format!("hello, {name}")))
        })
        .stream_resolver("Subscription", "countdown", |_args, _ctx| {
            Ok(vec![json!(3), json!(2), json!(1)])
        });

    let schema = Schema::builder(engine)
        .query(query)
        .subscription(subscription)
        .middleware(Shout)
        .extension(RequestTimer::new())
        .build()?;

    println!("{}", schema.to_sdl());

    let result = schema
        .execute(
            ExecutionRequest::new("query Greet($name: String) { greet(name: $name) }")
                .variable("name", json!("trellis")),
        )
        .await;
    println!("execute: {}", serde_json::to_string_pretty(&result)?);

    let mut stream = schema.subscribe("subscription { countdown }")?;
    while let Some(event) = stream.next().await {
        println!("event: {}", serde_json::to_string(&event)?);
    }

    Ok(())
}
