//! Per-test-file execution environment.
//!
//! Each test file runs against a fresh scope: a private set of global
//! bindings plus a minimal built-in surface, with timer primitives
//! intercepted by a virtual clock. Nothing in a scope outlives disposal and
//! nothing is shared between two environments, which is what makes parallel
//! execution by an external worker pool safe.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use super::clock::{FakeTimers, TimerCallback, TimerId};

/// Failure raised by compiled test code.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A test file compiled into a callable. The scope argument is the only
/// world the code can see.
pub type CompiledScript = Box<dyn FnMut(&mut Scope) -> Result<Value, ScriptError> + Send>;

/// Extra globals installed into every scope an environment creates.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentConfig {
    pub globals: HashMap<String, Value>,
}

/// A deferred computation: built eagerly, forced at most once.
pub struct Deferred {
    thunk: Option<Box<dyn FnOnce() -> Value + Send>>,
}

impl Deferred {
    pub fn new(thunk: impl FnOnce() -> Value + Send + 'static) -> Self {
        Self {
            thunk: Some(Box::new(thunk)),
        }
    }

    /// Force the computation. Returns `None` if already forced.
    pub fn resolve(&mut self) -> Option<Value> {
        self.thunk.take().map(|f| f())
    }
}

/// The global scope a compiled script executes against.
///
/// The built-in surface is deliberately small: timer scheduling and
/// cancellation (routed through the virtual clock), a NaN test, a binary
/// buffer allocator, structured-data parse/serialize, and deferred
/// computations. Everything else must come in through
/// [`EnvironmentConfig::globals`].
pub struct Scope {
    globals: HashMap<String, Value>,
    timers: FakeTimers,
}

impl Scope {
    fn new(config: &EnvironmentConfig) -> Self {
        Self {
            globals: config.globals.clone(),
            timers: FakeTimers::new(),
        }
    }

    /// Schedule a one-shot callback on the scope's clock.
    pub fn set_timeout(&mut self, delay: Duration, callback: TimerCallback) -> TimerId {
        self.timers.set_timeout(delay, callback)
    }

    /// Schedule a repeating callback on the scope's clock.
    pub fn set_interval(&mut self, period: Duration, callback: TimerCallback) -> TimerId {
        self.timers.set_interval(period, callback)
    }

    /// Cancel a scheduled callback.
    pub fn clear_timer(&mut self, id: TimerId) {
        self.timers.clear(id);
    }

    pub fn is_nan(&self, value: f64) -> bool {
        value.is_nan()
    }

    /// Allocate a zeroed binary buffer.
    pub fn alloc_buffer(&self, len: usize) -> Vec<u8> {
        vec![0; len]
    }

    pub fn json_parse(&self, text: &str) -> Result<Value, ScriptError> {
        serde_json::from_str(text).map_err(|e| ScriptError::new(e.to_string()))
    }

    pub fn json_stringify(&self, value: &Value) -> Result<String, ScriptError> {
        serde_json::to_string(value).map_err(|e| ScriptError::new(e.to_string()))
    }

    /// Wrap a computation for later forcing.
    pub fn defer(&self, thunk: impl FnOnce() -> Value + Send + 'static) -> Deferred {
        Deferred::new(thunk)
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    /// The scope's clock, for the owning executor to flush.
    pub fn timers(&mut self) -> &mut FakeTimers {
        &mut self.timers
    }
}

/// One isolated, revocable execution context.
pub struct TestEnvironment {
    scope: Option<Scope>,
}

impl TestEnvironment {
    /// Allocate a fresh scope with the built-in surface, the configured
    /// extra globals, and a virtual clock starting at zero.
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self {
            scope: Some(Scope::new(config)),
        }
    }

    /// Execute compiled test code against this environment's scope.
    ///
    /// Errors the code raises propagate inside `Some`. After
    /// [`dispose`](Self::dispose) this is a no-op returning `None`.
    pub fn run_script(&mut self, script: &mut CompiledScript) -> Option<Result<Value, ScriptError>> {
        match self.scope.as_mut() {
            Some(scope) => Some(script(scope)),
            None => {
                crate::debug_event!("sandbox", "run_script after dispose ignored");
                None
            }
        }
    }

    /// Run `f` with timer primitives redirected to the real clock,
    /// restoring interception afterwards. No-op after disposal.
    pub fn run_with_real_timers<T>(&mut self, f: impl FnOnce(&mut Scope) -> T) -> Option<T> {
        let scope = self.scope.as_mut()?;
        scope.timers.set_real_mode(true);
        let value = f(scope);
        scope.timers.set_real_mode(false);
        Some(value)
    }

    /// Direct access to the live scope, if not disposed.
    pub fn scope_mut(&mut self) -> Option<&mut Scope> {
        self.scope.as_mut()
    }

    /// Release pending clock entries and drop the scope. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(scope) = self.scope.as_mut() {
            scope.timers.clear_all();
        }
        self.scope = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.scope.is_none()
    }
}
