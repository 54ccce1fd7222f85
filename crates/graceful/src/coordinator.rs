//! The shutdown coordinator tying the stack, listener and exit policy together

use crate::action::Action;
use crate::policy::{ErrorSink, ExitPolicy};
use crate::signals::{self, DEFAULT_SIGNALS};
use crate::stack::{self, ActionStack, Trigger};
use graceful_core::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};

/// The process-wide coordinator, created on first use and never torn down
pub(crate) static GLOBAL: Lazy<Coordinator> = Lazy::new(Coordinator::new);

/// Every coordinator created in this process, oldest first
static LIVE: Lazy<Mutex<Vec<Weak<Shared>>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Held from the first final cleanup pass until the process exits
static SHUTDOWN: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Observable lifecycle of a coordinator
///
/// The terminal state is the process exit itself and is never observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not watching any signal yet
    Uninitialized,
    /// Watching signals, no actions registered
    Initialized,
    /// Watching signals with at least one registered action
    InitializedWithActions,
}

struct Shared {
    inner: Mutex<Inner>,
    // Separate from `inner` so actions may change them mid-pass
    policy: RwLock<ExitPolicy>,
    sink: RwLock<Option<ErrorSink>>,
}

#[derive(Default)]
struct Inner {
    stack: ActionStack,
    // `None` until initialized
    signals: Option<Vec<i32>>,
}

/// Registers cleanup actions and runs them on exit or termination signal
///
/// Cloning is cheap and every clone drives the same stack. The process-wide
/// instance lives behind [`crate::global`]; separate instances are useful for
/// embedding and tests.
///
/// Terminating the process is process-wide. [`exit`](Coordinator::exit) and
/// a watched signal both run the pending actions of every live coordinator,
/// most recently created first, and only then exit. No pass is cut short by
/// another coordinator exiting. The exit code follows the policy of the
/// coordinator that called `exit`. For a signal it follows the process-wide
/// coordinator if that one watches the signal, otherwise the most recently
/// created coordinator watching it. A signal no live coordinator watches gets
/// its default action.
///
/// Actions run with the coordinator lock held. An action that registers new
/// actions, triggers cleanup or exits deadlocks.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    /// Create an uninitialized coordinator with the default exit policy
    pub fn new() -> Self {
        Self::with_policy(ExitPolicy::default())
    }

    /// Create an uninitialized coordinator with `policy`
    pub fn with_policy(policy: ExitPolicy) -> Self {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner::default()),
            policy: RwLock::new(policy),
            sink: RwLock::new(None),
        });

        let mut live = LIVE.lock();
        live.retain(|w| w.strong_count() > 0);
        live.push(Arc::downgrade(&shared));

        Self { shared }
    }

    /// Register a batch of actions, returning a trigger for just that batch
    ///
    /// The first registration starts watching the default signal set. All
    /// registered actions also run, last first, on [`exit`] or a watched
    /// signal; an action already run by its trigger is skipped.
    ///
    /// [`exit`]: Coordinator::exit
    pub fn defer<I>(&self, actions: I) -> Trigger
    where
        I: IntoIterator<Item = Action>,
    {
        let batch: Arc<[Arc<Action>]> = actions.into_iter().map(Arc::new).collect();

        let mut inner = self.shared.inner.lock();
        ensure_listening(&mut inner);
        inner.stack.push_batch(&batch);
        tracing::debug!(
            actions = batch.len(),
            total = inner.stack.len(),
            "registered cleanup batch"
        );
        drop(inner);

        Trigger::new(self.clone(), batch)
    }

    /// Start watching the default signal set if not watching anything yet
    pub fn initialize(&self) {
        ensure_listening(&mut self.shared.inner.lock());
    }

    /// Replace the watched signal set
    ///
    /// An empty slice selects [`DEFAULT_SIGNALS`]. Signals dropped from the
    /// set get their default action back unless another live coordinator
    /// still watches them. On error the previous set stays in effect.
    pub fn set_signals(&self, signals: &[i32]) -> Result<()> {
        let signals = if signals.is_empty() {
            DEFAULT_SIGNALS
        } else {
            signals
        };

        let mut inner = self.shared.inner.lock();
        signals::subscribe(signals, dispatch_signal)?;
        inner.signals = Some(signals.to_vec());
        tracing::debug!(?signals, "watched signals replaced");
        Ok(())
    }

    /// Signals currently watched, empty while uninitialized
    pub fn signals(&self) -> Vec<i32> {
        self.shared
            .inner
            .lock()
            .signals
            .clone()
            .unwrap_or_default()
    }

    fn watches(&self, signal: i32) -> bool {
        self.shared
            .inner
            .lock()
            .signals
            .as_ref()
            .map_or(false, |s| s.contains(&signal))
    }

    pub fn state(&self) -> State {
        let inner = self.shared.inner.lock();
        match (&inner.signals, inner.stack.is_empty()) {
            (None, _) => State::Uninitialized,
            (Some(_), true) => State::Initialized,
            (Some(_), false) => State::InitializedWithActions,
        }
    }

    /// Number of actions ever registered, consumed ones included
    pub fn len(&self) -> usize {
        self.shared.inner.lock().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.inner.lock().stack.is_empty()
    }

    /// Number of registered actions that have not run yet
    pub fn pending(&self) -> usize {
        self.shared.inner.lock().stack.pending()
    }

    /// Number of batches ever registered
    pub fn batches(&self) -> usize {
        self.shared.inner.lock().stack.batches()
    }

    /// Run every pending action, last registered first, without exiting
    ///
    /// Only this coordinator's actions run. Returns whether any action failed.
    pub fn cleanup_all(&self) -> bool {
        let inner = self.shared.inner.lock();
        tracing::debug!(pending = inner.stack.pending(), "running full cleanup");
        stack::cleanup(inner.stack.actions(), |e| self.report(e))
    }

    /// Run the pending actions of every live coordinator and terminate
    ///
    /// `EXIT_CODE_AUTO` exits with this coordinator's ok or error code
    /// depending on whether any action failed; any other code is used
    /// unchanged.
    pub fn exit(&self, code: i32) -> ! {
        let _shutdown = SHUTDOWN.lock();
        let erred = cleanup_live();
        let code = self.exit_policy().code_for_exit(code, erred);
        tracing::info!(code, erred, "exiting after cleanup");
        std::process::exit(code)
    }

    /// Terminate for a caught signal; `SHUTDOWN` is already held
    fn exit_on_signal(&self, signal: i32) -> ! {
        let erred = cleanup_live();
        let code = self.exit_policy().code_for_signal(signal);
        tracing::info!(signal, code, erred, "exiting after cleanup for signal");
        std::process::exit(code)
    }

    pub fn exit_policy(&self) -> ExitPolicy {
        *self.shared.policy.read()
    }

    pub fn set_exit_policy(&self, policy: ExitPolicy) {
        *self.shared.policy.write() = policy;
    }

    /// Modify the exit policy in place
    ///
    /// Safe to call from inside a running action.
    pub fn update_exit_policy<F>(&self, f: F)
    where
        F: FnOnce(&mut ExitPolicy),
    {
        f(&mut self.shared.policy.write());
    }

    /// Report every failed action to `sink`, replacing any previous sink
    pub fn set_error_sink<F>(&self, sink: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        *self.shared.sink.write() = Some(Arc::new(sink));
    }

    pub fn clear_error_sink(&self) {
        *self.shared.sink.write() = None;
    }

    pub(crate) fn run_batch(&self, batch: &[Arc<Action>]) -> bool {
        let _inner = self.shared.inner.lock();
        stack::cleanup(batch, |e| self.report(e))
    }

    fn report(&self, error: &Error) {
        tracing::warn!(error = %error, "cleanup action failed");
        // Cloned out so the sink may replace itself
        let sink = self.shared.sink.read().clone();
        if let Some(sink) = sink {
            sink(error);
        }
    }
}

fn ensure_listening(inner: &mut Inner) {
    if inner.signals.is_some() {
        return;
    }
    match signals::subscribe(DEFAULT_SIGNALS, dispatch_signal) {
        Ok(()) => inner.signals = Some(DEFAULT_SIGNALS.to_vec()),
        Err(e) => tracing::error!(error = %e, "failed to start signal listener"),
    }
}

/// Live coordinators, most recently created first
fn live() -> Vec<Coordinator> {
    LIVE.lock()
        .iter()
        .rev()
        .filter_map(Weak::upgrade)
        .map(|shared| Coordinator { shared })
        .collect()
}

/// Final cleanup pass over every live coordinator
fn cleanup_live() -> bool {
    live()
        .iter()
        .fold(false, |erred, coordinator| coordinator.cleanup_all() | erred)
}

/// Coordinator whose exit policy applies to `signal`, if any watches it
fn signal_owner(signal: i32) -> Option<Coordinator> {
    if let Some(global) = Lazy::get(&GLOBAL) {
        if global.watches(signal) {
            return Some(global.clone());
        }
    }
    live().into_iter().find(|c| c.watches(signal))
}

fn dispatch_signal(signal: i32) -> bool {
    let _shutdown = SHUTDOWN.lock();
    match signal_owner(signal) {
        Some(owner) => owner.exit_on_signal(signal),
        None => false,
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state())
            .field("actions", &self.len())
            .field("policy", &self.exit_policy())
            .finish()
    }
}
