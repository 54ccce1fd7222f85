//! Process-wide graceful shutdown.
//!
//! Any part of a program registers cleanup actions (closing files, releasing
//! locks, flushing buffers) and gets back a [`Trigger`] for just that batch.
//! Every registered action runs exactly once, last registered first, whether
//! the batch is triggered locally, the program calls [`exit`], or the process
//! receives a watched termination signal.
//!
//! ```no_run
//! use graceful::Action;
//! use std::io::Write;
//!
//! let log = std::fs::File::create("/tmp/app.log")?;
//! let mut writer = std::io::BufWriter::new(log.try_clone()?);
//! writer.write_all(b"starting\n")?;
//!
//! let _cleanup = graceful::defer([
//!     Action::close(log),
//!     Action::close(writer),
//! ])
//! .into_guard();
//!
//! // On SIGINT, SIGHUP or SIGTERM the writer is flushed, then the file synced.
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## Key Components
//!
//! - **`action`**: [`Action`] constructors for plain procedures, fallible
//!   procedures and [`Close`] resources, and the panic boundary they run in.
//! - **`stack`**: The append-only action stack, cleanup passes and
//!   [`Trigger`].
//! - **`signals`**: The lazily started background signal listener.
//! - **`policy`**: [`ExitPolicy`], mapping cleanup outcome and signals to the
//!   final exit code.
//! - **`coordinator`**: [`Coordinator`], and the process-wide instance behind
//!   the free functions of this crate.

pub mod action;
pub mod coordinator;
pub mod policy;
pub mod signals;
pub mod stack;

pub use action::{Action, Close};
pub use coordinator::{Coordinator, State};
pub use graceful_core::{BoxError, Error, Result, EXIT_CODE_AUTO, EXIT_CODE_ERR, EXIT_CODE_OK};
pub use policy::{ErrorSink, ExitPolicy};
pub use signals::DEFAULT_SIGNALS;
pub use stack::{Trigger, TriggerGuard};

use coordinator::GLOBAL;

/// The process-wide coordinator
pub fn global() -> &'static Coordinator {
    &GLOBAL
}

/// Register a batch of actions with the process-wide coordinator
///
/// See [`Coordinator::defer`].
pub fn defer<I>(actions: I) -> Trigger
where
    I: IntoIterator<Item = Action>,
{
    GLOBAL.defer(actions)
}

/// Start listening for the default signals if not already listening
pub fn initialize() {
    GLOBAL.initialize()
}

/// Replace the signals watched by the process-wide coordinator
///
/// An empty slice selects [`DEFAULT_SIGNALS`].
pub fn set_signals(signals: &[i32]) -> Result<()> {
    GLOBAL.set_signals(signals)
}

/// Run all pending cleanup actions and terminate the process
///
/// Actions registered with other live coordinators run too.
///
/// Pass [`EXIT_CODE_AUTO`] to exit with the policy's ok or error code
/// depending on whether any action failed.
pub fn exit(code: i32) -> ! {
    GLOBAL.exit(code)
}

/// Run all pending cleanup actions without exiting
pub fn cleanup_all() -> bool {
    GLOBAL.cleanup_all()
}

pub fn exit_policy() -> ExitPolicy {
    GLOBAL.exit_policy()
}

pub fn set_exit_policy(policy: ExitPolicy) {
    GLOBAL.set_exit_policy(policy)
}

pub fn update_exit_policy<F>(f: F)
where
    F: FnOnce(&mut ExitPolicy),
{
    GLOBAL.update_exit_policy(f)
}

pub fn set_error_sink<F>(sink: F)
where
    F: Fn(&Error) + Send + Sync + 'static,
{
    GLOBAL.set_error_sink(sink)
}

pub fn clear_error_sink() {
    GLOBAL.clear_error_sink()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serial_test::serial;
    use std::sync::Arc;

    #[test]
    #[serial]
    fn test_global_defer_and_cleanup() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&log), Arc::clone(&log));

        let trigger = defer([
            Action::new(move || a.lock().push("first")),
            Action::new(move || b.lock().push("second")),
        ]);
        assert!(std::ptr::eq(global(), global()));
        assert_ne!(global().state(), State::Uninitialized);

        assert!(!cleanup_all());
        assert!(trigger.is_done());
        assert_eq!(*log.lock(), vec!["second", "first"]);
    }

    #[test]
    #[serial]
    fn test_global_error_sink() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        set_error_sink(move |e| sink.lock().push(e.to_string()));

        let trigger = defer([Action::fallible(|| Err::<(), _>("socket busy"))]);
        assert!(trigger.run());
        clear_error_sink();

        assert_eq!(*errors.lock(), vec!["cleanup action failed: socket busy"]);
    }

    #[test]
    #[serial]
    fn test_global_policy_update() {
        let original = exit_policy();
        update_exit_policy(|p| p.err_code = 99);
        assert_eq!(exit_policy().err_code, 99);

        set_exit_policy(original);
        assert_eq!(exit_policy(), original);
    }
}
