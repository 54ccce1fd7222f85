//! Cleanup actions and the panic boundary they execute behind

use graceful_core::{BoxError, Error, Result, ABNORMAL_TERMINATION};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::io::{BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};

type Callable = Box<dyn FnOnce() -> Result<()> + Send>;

/// A resource that can be released by consuming it
///
/// This is the only resource shape an [`Action`] accepts besides plain
/// closures; anything else is rejected by the compiler at registration.
pub trait Close: Send + 'static {
    /// Release the resource
    fn close(self) -> Result<()>;
}

impl Close for std::fs::File {
    fn close(self) -> Result<()> {
        self.sync_all()?;
        Ok(())
    }
}

impl<W: Write + Send + 'static> Close for BufWriter<W> {
    fn close(mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }
}

impl Close for std::process::Child {
    fn close(mut self) -> Result<()> {
        if self.try_wait()?.is_none() {
            self.kill()?;
        }
        self.wait()?;
        Ok(())
    }
}

/// A registered unit of cleanup work, executed at most once
///
/// Once executed the callable is dropped and further executions do nothing,
/// whether the first run succeeded, failed or panicked.
pub struct Action {
    callable: Mutex<Option<Callable>>,
}

impl Action {
    /// Wrap a procedure that cannot fail
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::from_callable(Box::new(move || {
            f();
            Ok(())
        }))
    }

    /// Wrap a procedure that reports failure through its return value
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::from_callable(Box::new(move || f().map_err(Error::action)))
    }

    /// Wrap a resource to be closed
    pub fn close<C: Close>(resource: C) -> Self {
        Self::from_callable(Box::new(move || resource.close()))
    }

    fn from_callable(callable: Callable) -> Self {
        Self {
            callable: Mutex::new(Some(callable)),
        }
    }

    /// Whether this action has already run
    pub fn is_consumed(&self) -> bool {
        self.callable.lock().is_none()
    }

    /// Run the action if it is still pending
    ///
    /// Panics raised by the callable are caught here and returned as
    /// [`Error::Panicked`].
    pub(crate) fn execute(&self) -> Result<()> {
        let Some(callable) = self.callable.lock().take() else {
            return Ok(());
        };

        match panic::catch_unwind(AssertUnwindSafe(callable)) {
            Ok(result) => result,
            Err(payload) => Err(Error::panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(e) = payload.downcast_ref::<Error>() {
        e.to_string()
    } else {
        ABNORMAL_TERMINATION.to_string()
    }
}
