//! Request context shared with resolvers and middleware.
//!
//! Combines a `TypeId`-keyed store for compile-time-safe values with a
//! string-keyed JSON store for loosely typed request data.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Per-request caller context.
///
/// Built by the caller before a request and handed read-only (behind
/// `Arc`) to the engine, middleware and resolvers.
///
/// # Example
///
/// ```
/// use trellis::context::RequestContext;
///
/// #[derive(Clone)]
/// struct CurrentUser(String);
///
/// let ctx = RequestContext::new()
///     .with(CurrentUser("u_1".into()))
///     .with_data("locale", "en");
///
/// assert_eq!(ctx.get::<CurrentUser>().unwrap().0, "u_1");
/// assert_eq!(ctx.data::<String>("locale").as_deref(), Some("en"));
/// ```
#[derive(Default)]
pub struct RequestContext {
    typed: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
    data: HashMap<String, serde_json::Value>,
}

impl RequestContext {
    /// Creates a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a typed value, replacing any existing value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.typed
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Gets a typed value by type.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.typed
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Returns true if the context holds a value of the given type.
    pub fn contains<T: 'static>(&self) -> bool {
        self.typed.contains_key(&TypeId::of::<T>())
    }

    /// Sets a JSON data entry.
    pub fn set_data<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        if let Ok(value) = serde_json::to_value(value) {
            self.data.insert(key.into(), value);
        }
    }

    /// Gets a JSON data entry, deserialized.
    pub fn data<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Adds a typed value and returns self.
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    /// Adds a JSON data entry and returns self.
    pub fn with_data<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Self {
        self.set_data(key, value);
        self
    }

    /// Finishes the context into the shared form requests carry.
    pub fn shared(self) -> SharedRequestContext {
        Arc::new(self)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("typed_count", &self.typed.len())
            .field("data", &self.data)
            .finish()
    }
}

/// A shareable, thread-safe request context.
pub type SharedRequestContext = Arc<RequestContext>;
