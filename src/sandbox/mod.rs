//! Isolated execution sandbox with a virtual clock.
//!
//! One [`TestEnvironment`] per test file execution: a private global scope,
//! timer primitives intercepted by [`FakeTimers`], and explicit disposal.
//! Two test files running in parallel never share an instance.

mod clock;
mod environment;

pub use clock::{FakeTimers, TimerCallback, TimerId};
pub use environment::{
    CompiledScript, Deferred, EnvironmentConfig, Scope, ScriptError, TestEnvironment,
};
