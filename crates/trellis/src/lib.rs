//! Trellis schema orchestration
//!
//! This crate turns declarative type definitions into an executable
//! schema: a type registry, a field-resolution middleware chain, a
//! request-lifecycle extensions runner and a uniform execution façade,
//! all layered over a pluggable [`engine::QueryEngine`].
//!
//! # Building and executing a schema
//!
//! ```ignore
//! use trellis::Schema;
//! use trellis::testing::MockEngine;
//! use trellis_types::{FieldDeclaration, ObjectDeclaration, TypeRef};
//!
//! let query = ObjectDeclaration::new("Query")
//!     .field(FieldDeclaration::new("hello", TypeRef::named("String")))
//!     .declare();
//!
//! let engine = MockEngine::new()
//!     .resolver("Query", "hello", |_parent, _args, _ctx| Ok("world".into()));
//!
//! let schema = Schema::builder(engine).query(query).build()?;
//! let result = schema.execute("{ hello }").await;
//! assert_eq!(result.data, Some(serde_json::json!({"hello": "world"})));
//! ```
//!
//! # Intercepting fields and observing requests
//!
//! ```ignore
//! use trellis::extensions::RequestTimer;
//!
//! let schema = Schema::builder(engine)
//!     .query(query)
//!     .middleware(AuthMiddleware::new())
//!     .extension(RequestTimer::new())
//!     .build()?;
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod execution;
pub mod extensions;
pub mod middleware;
pub mod printer;
pub mod registry;
pub mod schema;
pub mod testing;

// Re-exports for convenience
pub use context::{RequestContext, SharedRequestContext};
pub use error::{GraphQLError, PathSegment, SchemaError, SubscriptionError, SyncExecutionError};
pub use execution::{ExecutionRequest, ExecutionResult, SubscriptionStream};
pub use extensions::{Extension, RequestPhase, RequestState, RequestTimer};
pub use middleware::{
    DirectiveAnnotation, FieldContext, FieldMiddleware, FieldResolver, MiddlewareFuture, Next,
};
pub use schema::{Schema, SchemaBuilder};

// The declaration model, re-exported so callers need a single import.
pub use trellis_types::{
    ArgumentDeclaration, DirectiveDeclaration, DirectiveLocation, EnumDeclaration,
    EnumValueDeclaration, FieldDeclaration, ObjectDeclaration, ScalarDeclaration, TypeDeclaration,
    TypeRef,
};
