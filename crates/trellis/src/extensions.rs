//! Request-lifecycle extensions.
//!
//! An [`Extension`] observes one request through paired start/end hooks
//! and contributes a structured result to the response's `extensions`
//! map. The long-lived [`ExtensionsRunner`] holds the extension list;
//! everything request-scoped lives in the [`RequestScope`] it hands out
//! per request, so no data can leak between requests.

use crate::error::GraphQLError;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::sync::Arc;
use std::time::Instant;

/// The lifecycle phases hooks fire around.
///
/// The façade fires the `Request` pair; the engine fires the others
/// through the scope handle it receives with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Request,
    Parse,
    Validation,
    Execution,
}

impl RequestPhase {
    /// Returns the lowercase phase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Parse => "parse",
            Self::Validation => "validation",
            Self::Execution => "execution",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Request => 0,
            Self::Parse => 1,
            Self::Validation => 2,
            Self::Execution => 3,
        }
    }
}

/// Per-request extension state: a typed store plus request metadata.
pub struct RequestState {
    typed: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
    /// The raw query text of the request.
    pub query: String,
    /// The requested operation name, if any.
    pub operation_name: Option<String>,
}

impl RequestState {
    fn new(query: &str, operation_name: Option<&str>) -> Self {
        Self {
            typed: FxHashMap::default(),
            query: query.to_string(),
            operation_name: operation_name.map(str::to_string),
        }
    }

    /// Inserts a typed value, replacing any existing value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.typed.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Gets a typed value.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.typed
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Gets a mutable typed value.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.typed
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut())
    }
}

/// A request-lifecycle observer.
///
/// All hooks default to no-ops; implement the pairs you care about. A
/// hook error fails the request (it is surfaced in the response's error
/// list) but never touches schema-level state.
pub trait Extension: Send + Sync {
    /// Identifier used as the key in the response's `extensions` map.
    fn key(&self) -> &str;

    fn request_start(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        let _ = state;
        Ok(())
    }

    fn request_end(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        let _ = state;
        Ok(())
    }

    fn parse_start(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        let _ = state;
        Ok(())
    }

    fn parse_end(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        let _ = state;
        Ok(())
    }

    fn validation_start(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        let _ = state;
        Ok(())
    }

    fn validation_end(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        let _ = state;
        Ok(())
    }

    fn execution_start(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        let _ = state;
        Ok(())
    }

    fn execution_end(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        let _ = state;
        Ok(())
    }

    /// Produces this extension's result for the completed request.
    fn collect(&self, state: &RequestState) -> Option<Value> {
        let _ = state;
        None
    }
}

/// Schema-lifetime holder of the ordered extension list.
pub struct ExtensionsRunner {
    extensions: Vec<Arc<dyn Extension>>,
}

impl ExtensionsRunner {
    pub(crate) fn new(extensions: Vec<Arc<dyn Extension>>) -> Self {
        Self { extensions }
    }

    /// Returns true if no extensions are configured.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Opens a fresh per-request scope.
    pub(crate) fn begin(&self, query: &str, operation_name: Option<&str>) -> RequestScope {
        RequestScope {
            extensions: self.extensions.clone(),
            state: Mutex::new(RequestState::new(query, operation_name)),
            hook_errors: Mutex::new(Vec::new()),
        }
    }
}

impl std::fmt::Debug for ExtensionsRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionsRunner")
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// One request's extension lifecycle handle.
///
/// The state sits behind a mutex only because the engine's execution
/// future holds a shared handle; a scope is never reused across requests.
pub struct RequestScope {
    extensions: Vec<Arc<dyn Extension>>,
    state: Mutex<RequestState>,
    hook_errors: Mutex<Vec<GraphQLError>>,
}

impl RequestScope {
    /// Fires the start hooks for a phase.
    pub fn phase_start(&self, phase: RequestPhase) {
        self.fire(phase, true);
    }

    /// Fires the end hooks for a phase.
    pub fn phase_end(&self, phase: RequestPhase) {
        self.fire(phase, false);
    }

    fn fire(&self, phase: RequestPhase, start: bool) {
        let mut state = self.state.lock();
        for extension in &self.extensions {
            let result = match (phase, start) {
                (RequestPhase::Request, true) => extension.request_start(&mut state),
                (RequestPhase::Request, false) => extension.request_end(&mut state),
                (RequestPhase::Parse, true) => extension.parse_start(&mut state),
                (RequestPhase::Parse, false) => extension.parse_end(&mut state),
                (RequestPhase::Validation, true) => extension.validation_start(&mut state),
                (RequestPhase::Validation, false) => extension.validation_end(&mut state),
                (RequestPhase::Execution, true) => extension.execution_start(&mut state),
                (RequestPhase::Execution, false) => extension.execution_end(&mut state),
            };
            if let Err(error) = result {
                tracing::warn!(
                    extension = extension.key(),
                    phase = phase.as_str(),
                    %error,
                    "extension hook failed"
                );
                self.hook_errors.lock().push(
                    error
                        .with_code("EXTENSION_ERROR")
                        .with_extension("extension", Value::String(extension.key().to_string())),
                );
            }
        }
    }

    /// Returns true if any hook has failed so far.
    pub fn has_hook_errors(&self) -> bool {
        !self.hook_errors.lock().is_empty()
    }

    /// Drains the hook errors collected during the request.
    pub(crate) fn take_hook_errors(&self) -> Vec<GraphQLError> {
        std::mem::take(&mut self.hook_errors.lock())
    }

    /// Collects every extension's result for the completed request.
    pub(crate) fn collect_results(&self) -> Option<IndexMap<String, Value>> {
        if self.extensions.is_empty() {
            return None;
        }
        let state = self.state.lock();
        let results: IndexMap<String, Value> = self
            .extensions
            .iter()
            .filter_map(|extension| {
                extension
                    .collect(&state)
                    .map(|value| (extension.key().to_string(), value))
            })
            .collect();
        if results.is_empty() {
            None
        } else {
            Some(results)
        }
    }
}

#[derive(Default)]
struct TimingState {
    started: [Option<Instant>; 4],
    elapsed_ms: [Option<f64>; 4],
}

/// Built-in extension recording wall-clock phase durations.
///
/// Contributes an object like
/// `{"request_ms": 1.2, "parse_ms": 0.1, ...}` under the `timing` key.
#[derive(Debug, Default)]
pub struct RequestTimer;

impl RequestTimer {
    /// Creates the timer extension.
    pub fn new() -> Self {
        Self
    }

    fn mark_start(state: &mut RequestState, phase: RequestPhase) -> Result<(), GraphQLError> {
        if state.get::<TimingState>().is_none() {
            state.insert(TimingState::default());
        }
        if let Some(timing) = state.get_mut::<TimingState>() {
            timing.started[phase.index()] = Some(Instant::now());
        }
        Ok(())
    }

    fn mark_end(state: &mut RequestState, phase: RequestPhase) -> Result<(), GraphQLError> {
        if let Some(timing) = state.get_mut::<TimingState>() {
            if let Some(started) = timing.started[phase.index()] {
                timing.elapsed_ms[phase.index()] = Some(started.elapsed().as_secs_f64() * 1000.0);
            }
        }
        Ok(())
    }
}

impl Extension for RequestTimer {
    fn key(&self) -> &str {
        "timing"
    }

    fn request_start(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        Self::mark_start(state, RequestPhase::Request)
    }

    fn request_end(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        Self::mark_end(state, RequestPhase::Request)
    }

    fn parse_start(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        Self::mark_start(state, RequestPhase::Parse)
    }

    fn parse_end(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        Self::mark_end(state, RequestPhase::Parse)
    }

    fn validation_start(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        Self::mark_start(state, RequestPhase::Validation)
    }

    fn validation_end(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        Self::mark_end(state, RequestPhase::Validation)
    }

    fn execution_start(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        Self::mark_start(state, RequestPhase::Execution)
    }

    fn execution_end(&self, state: &mut RequestState) -> Result<(), GraphQLError> {
        Self::mark_end(state, RequestPhase::Execution)
    }

    fn collect(&self, state: &RequestState) -> Option<Value> {
        let timing = state.get::<TimingState>()?;
        let mut result = serde_json::Map::new();
        for phase in [
            RequestPhase::Request,
            RequestPhase::Parse,
            RequestPhase::Validation,
            RequestPhase::Execution,
        ] {
            if let Some(elapsed) = timing.elapsed_ms[phase.index()] {
                result.insert(
                    format!("{}_ms", phase.as_str()),
                    serde_json::json!(elapsed),
                );
            }
        }
        Some(Value::Object(result))
    }
}
