//! The watch session loop: an explicit three-state machine driven by
//! filesystem events.

use std::path::{Path, PathBuf};

use console::Term;
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::sleep_until;

use super::debounce::Debounce;
use super::error::WatchError;
use crate::runner::{RunContext, run_once};
use crate::selection::RequestShape;

/// Where a session stands. At most one debounce deadline is armed
/// (`Debouncing`) and at most one cycle is in flight (`Running`) at any
/// time; the enum makes both invariants part of the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No deadline armed, no cycle in flight.
    Idle,
    /// A deadline is armed; every qualifying event re-arms it.
    Debouncing,
    /// A cycle is in flight. Events are dropped for scheduling until it
    /// completes.
    Running,
}

/// One watch-mode session: owns the watcher subscription, the debounce
/// deadline, and the run-exclusivity state.
///
/// The session re-derives its request each cycle, so changed-only mode
/// recomputes the changed set on every run while pattern mode reuses the
/// standing pattern. A cycle always runs to completion; there is no
/// cooperative cancellation, and a hung execution keeps the session in
/// `Running` indefinitely.
pub struct WatchSession {
    ctx: RunContext,
    shape: RequestShape,
    watch_root: PathBuf,
    state: WatchState,
    debounce: Debounce,
    term: Term,
}

type EventReceiver = mpsc::UnboundedReceiver<notify::Result<notify::Event>>;

impl WatchSession {
    /// Build a session over a run context, the request to repeat, and the
    /// directory to watch recursively.
    pub fn new(ctx: RunContext, shape: RequestShape, watch_root: impl Into<PathBuf>) -> Self {
        let debounce = Debounce::new(ctx.settings.debounce_ms);
        Self {
            ctx,
            shape,
            watch_root: watch_root.into(),
            state: WatchState::Idle,
            debounce,
            term: Term::stdout(),
        }
    }

    /// Current position in the state machine.
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Watch until the event channel closes. Runs one cycle up front, then
    /// one per quiet period after a burst of qualifying events.
    pub async fn run(mut self) -> Result<(), WatchError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&self.watch_root, RecursiveMode::Recursive)?;

        crate::log_event!("watch", "session started", "{}", self.watch_root.display());
        self.run_cycle(&mut rx).await;

        loop {
            match self.debounce.deadline() {
                Some(deadline) => {
                    tokio::select! {
                        maybe = rx.recv() => self.handle_event(maybe)?,
                        _ = sleep_until(deadline) => {
                            self.debounce.clear();
                            self.run_cycle(&mut rx).await;
                        }
                    }
                }
                None => {
                    let maybe = rx.recv().await;
                    self.handle_event(maybe)?;
                }
            }
        }
    }

    fn handle_event(
        &mut self,
        maybe: Option<notify::Result<notify::Event>>,
    ) -> Result<(), WatchError> {
        match maybe {
            Some(Ok(event)) => {
                for path in &event.paths {
                    self.note_event(path);
                }
                Ok(())
            }
            Some(Err(e)) => {
                tracing::error!("[watch] watcher error: {e}");
                Ok(())
            }
            None => Err(WatchError::ChannelClosed),
        }
    }

    /// Feed one event path into the state machine. Returns whether the
    /// event (re)armed the debounce deadline.
    fn note_event(&mut self, path: &Path) -> bool {
        if !self.qualifies(path) {
            return false;
        }
        match self.state {
            WatchState::Running => {
                crate::debug_event!("watch", "event dropped during run", "{}", path.display());
                false
            }
            WatchState::Idle | WatchState::Debouncing => {
                crate::debug_event!("watch", "change", "{}", path.display());
                self.debounce.record();
                self.state = WatchState::Debouncing;
                true
            }
        }
    }

    /// Whether an event path can schedule a run: a watched extension, and
    /// once resolved against the watch root, inside a configured root.
    fn qualifies(&self, path: &Path) -> bool {
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.watch_root.join(path)
        };

        let watched_ext = resolved
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.ctx
                    .settings
                    .module_file_extensions
                    .iter()
                    .any(|e| e == ext)
            });

        watched_ext
            && self
                .ctx
                .engine
                .roots()
                .iter()
                .any(|root| resolved.starts_with(root))
    }

    /// One selection+execution cycle. Events arriving while it is in
    /// flight are received and dropped, never scheduled. The session
    /// returns to `Idle` whether the cycle succeeds or fails.
    async fn run_cycle(&mut self, rx: &mut EventReceiver) {
        self.state = WatchState::Running;
        self.term.clear_screen().ok();

        let outcome = {
            let cycle = run_once(&self.ctx, &self.shape);
            tokio::pin!(cycle);
            loop {
                tokio::select! {
                    outcome = &mut cycle => break outcome,
                    maybe = rx.recv() => {
                        match maybe {
                            Some(_) => {
                                crate::debug_event!("watch", "event dropped during run");
                            }
                            // Channel gone; just let the cycle finish.
                            None => break (&mut cycle).await,
                        }
                    }
                }
            }
        };

        match outcome {
            Ok(results) => {
                crate::log_event!(
                    "watch",
                    "cycle finished",
                    "{}/{} suites passed",
                    results.passed_suites,
                    results.total_suites
                );
            }
            Err(e) => tracing::error!("[watch] cycle failed: {e}"),
        }

        self.state = WatchState::Idle;
    }
}
