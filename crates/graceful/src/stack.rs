//! The action stack, cleanup passes and per-batch triggers

use crate::action::Action;
use crate::coordinator::Coordinator;
use graceful_core::Error;
use std::sync::Arc;

/// Every action ever registered with a coordinator, in registration order
///
/// Entries are shared with the [`Trigger`] of the batch that registered them,
/// so an action consumed through its trigger is also consumed here.
#[derive(Debug, Default)]
pub(crate) struct ActionStack {
    actions: Vec<Arc<Action>>,
    batches: usize,
}

impl ActionStack {
    pub(crate) fn push_batch(&mut self, batch: &[Arc<Action>]) {
        self.actions.extend(batch.iter().cloned());
        self.batches += 1;
    }

    pub(crate) fn actions(&self) -> &[Arc<Action>] {
        &self.actions
    }

    pub(crate) fn len(&self) -> usize {
        self.actions.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub(crate) fn pending(&self) -> usize {
        self.actions.iter().filter(|a| !a.is_consumed()).count()
    }

    pub(crate) fn batches(&self) -> usize {
        self.batches
    }
}

/// Run one cleanup pass over `actions`, last first
///
/// Every pending action is attempted; each failure goes to `report` and the
/// pass carries on. Returns whether any action failed.
pub(crate) fn cleanup<F>(actions: &[Arc<Action>], report: F) -> bool
where
    F: Fn(&Error),
{
    let mut erred = false;
    for action in actions.iter().rev() {
        if let Err(e) = action.execute() {
            erred = true;
            report(&e);
        }
    }
    erred
}

/// Runs the cleanup of exactly one registered batch
///
/// Returned by [`Coordinator::defer`]. Running it more than once is safe:
/// actions that already ran are skipped.
#[derive(Clone)]
#[must_use = "a trigger does nothing unless it is run or turned into a guard"]
pub struct Trigger {
    coordinator: Coordinator,
    batch: Arc<[Arc<Action>]>,
}

impl Trigger {
    pub(crate) fn new(coordinator: Coordinator, batch: Arc<[Arc<Action>]>) -> Self {
        Self { coordinator, batch }
    }

    /// Run the batch in reverse order, returning whether any action failed
    ///
    /// Holds the coordinator lock for the whole pass, so the actions must not
    /// register or trigger cleanup on the same coordinator.
    pub fn run(&self) -> bool {
        self.coordinator.run_batch(&self.batch)
    }

    /// Number of actions in the batch
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Whether every action of the batch has run
    pub fn is_done(&self) -> bool {
        self.batch.iter().all(|a| a.is_consumed())
    }

    /// Run the batch when the returned guard goes out of scope
    pub fn into_guard(self) -> TriggerGuard {
        TriggerGuard {
            trigger: self,
            armed: true,
        }
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("len", &self.len())
            .field("done", &self.is_done())
            .finish()
    }
}

/// Scoped guard that runs a [`Trigger`] on drop
#[derive(Debug)]
#[must_use = "the batch runs as soon as the guard is dropped"]
pub struct TriggerGuard {
    trigger: Trigger,
    armed: bool,
}

impl TriggerGuard {
    /// Keep the batch registered but stop the guard from running it
    ///
    /// The actions stay on the coordinator stack and still run on exit or on
    /// a termination signal.
    pub fn cancel(mut self) -> Trigger {
        self.armed = false;
        self.trigger.clone()
    }
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        if self.armed {
            self.trigger.run();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn logged(log: &Arc<Mutex<Vec<usize>>>, n: usize) -> Arc<Action> {
        let log = Arc::clone(log);
        Arc::new(Action::new(move || log.lock().push(n)))
    }

    #[test]
    fn test_cleanup_runs_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let actions: Vec<_> = (0..5).map(|n| logged(&log, n)).collect();

        assert!(!cleanup(&actions, |_| {}));
        assert_eq!(*log.lock(), vec![4, 3, 2, 1, 0]);

        // Second pass finds only consumed actions
        assert!(!cleanup(&actions, |_| {}));
        assert_eq!(log.lock().len(), 5);
    }

    #[test]
    fn test_cleanup_empty() {
        assert!(!cleanup(&[], |_| panic!("nothing to report")));
    }

    #[test]
    fn test_cleanup_continues_after_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let actions = vec![
            logged(&log, 0),
            Arc::new(Action::new(|| panic!("first"))),
            logged(&log, 2),
            Arc::new(Action::fallible(|| Err::<(), _>("second"))),
        ];

        let reported = Mutex::new(Vec::new());
        let erred = cleanup(&actions, |e| reported.lock().push(e.to_string()));

        assert!(erred);
        assert_eq!(*log.lock(), vec![2, 0]);
        let reported = reported.into_inner();
        assert_eq!(reported.len(), 2);
        assert!(reported[0].contains("second"));
        assert!(reported[1].contains("first"));
    }

    #[test]
    fn test_stack_bookkeeping() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ActionStack::default();
        assert!(stack.is_empty());

        stack.push_batch(&[logged(&log, 0), logged(&log, 1)]);
        stack.push_batch(&[logged(&log, 2)]);
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.batches(), 2);
        assert_eq!(stack.pending(), 3);

        cleanup(&stack.actions()[..2], |_| {});
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pending(), 1);
    }
}
