//! Process-wide listener turning OS termination signals into a shutdown
//!
//! A single background thread serves every coordinator in the process. Its
//! subscription only ever grows: a signal that no live coordinator watches
//! any more gets its default disposition back when it arrives, so dropping a
//! coordinator or narrowing a signal set never leaves a signal swallowed.

pub(crate) use imp::subscribe;
pub use imp::DEFAULT_SIGNALS;

/// Called on the listener thread for each delivered signal
///
/// Returns `false` when no coordinator watches the signal. A dispatcher that
/// handles the signal terminates the process instead of returning.
pub(crate) type Dispatch = fn(i32) -> bool;

#[cfg(unix)]
mod imp {
    use super::Dispatch;
    use graceful_core::{Error, Result};
    use once_cell::sync::Lazy;
    use parking_lot::Mutex;
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::{Handle, Signals};
    use signal_hook::low_level;
    use std::thread;

    /// Signals watched when no explicit set is given
    pub const DEFAULT_SIGNALS: &[i32] = &[SIGINT, SIGHUP, SIGTERM];

    /// Handle of the running listener; `None` until the first subscription
    static LISTENER: Lazy<Mutex<Option<Handle>>> = Lazy::new(|| Mutex::new(None));

    /// Make sure `signals` reach `dispatch`, starting the listener on first use
    ///
    /// Only the first call's `dispatch` is kept.
    pub(crate) fn subscribe(signals: &[i32], dispatch: Dispatch) -> Result<()> {
        let mut listener = LISTENER.lock();

        if let Some(handle) = listener.as_ref() {
            for &signal in signals {
                handle
                    .add_signal(signal)
                    .map_err(|e| Error::signal(signals, e))?;
            }
            tracing::debug!(?signals, "signal listener subscription extended");
            return Ok(());
        }

        let subscription = Signals::new(signals).map_err(|e| Error::signal(signals, e))?;
        let handle = subscription.handle();

        thread::Builder::new()
            .name("graceful-signals".to_string())
            .spawn(move || listen(subscription, dispatch))
            .map_err(|e| Error::signal(signals, e))?;

        tracing::debug!(?signals, "signal listener started");
        *listener = Some(handle);
        Ok(())
    }

    fn listen(mut subscription: Signals, dispatch: Dispatch) {
        for signal in subscription.forever() {
            tracing::info!(signal, "received termination signal");
            if !dispatch(signal) {
                tracing::debug!(signal, "signal no longer watched, applying default action");
                if let Err(e) = low_level::emulate_default_handler(signal) {
                    tracing::error!(signal, error = %e, "failed to apply default signal action");
                }
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use super::Dispatch;
    use graceful_core::Result;

    /// Signals watched when no explicit set is given
    pub const DEFAULT_SIGNALS: &[i32] = &[];

    pub(crate) fn subscribe(_signals: &[i32], _dispatch: Dispatch) -> Result<()> {
        tracing::debug!("no OS signal delivery on this target");
        Ok(())
    }
}
