// Runner registry - the process-wide view of live replays
//
// Membership answers two questions: "is this runner already running?" (run()
// rejects double-starts) and "what is replaying right now?" (management code
// enumerates and broadcasts). A runner is a member exactly between run() and
// its done signal; the dispatch loop removes itself before signaling.
//
// The registry is an explicit object handed to each Runner rather than a
// process global, so tests and embedders can keep fleets apart.

use super::Operation;
use crate::error::ReplayError;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Process-unique identity for one Runner instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunnerId(u64);

impl RunnerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RunnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runner-{}", self.0)
    }
}

/// What the registry keeps per live runner: enough to reach its mailbox.
pub(crate) struct RunnerControl {
    pub(crate) ops: mpsc::Sender<Operation>,
}

/// Mutex-guarded set of live runners.
#[derive(Clone, Default)]
pub struct Registry {
    runners: Arc<Mutex<HashMap<RunnerId, RunnerControl>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, id: RunnerId, control: RunnerControl) -> Result<(), ReplayError> {
        let mut runners = self.runners.lock().unwrap();
        if runners.contains_key(&id) {
            return Err(ReplayError::AlreadyRunning);
        }
        runners.insert(id, control);
        Ok(())
    }

    pub(crate) fn deregister(&self, id: RunnerId) {
        self.runners.lock().unwrap().remove(&id);
    }

    pub fn contains(&self, id: RunnerId) -> bool {
        self.runners.lock().unwrap().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.runners.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of every live runner, in no particular order.
    pub fn ids(&self) -> Vec<RunnerId> {
        self.runners.lock().unwrap().keys().copied().collect()
    }

    /// Pause every live runner.
    pub fn pause_all(&self) {
        self.broadcast(Operation::Pause);
    }

    /// Resume every live runner.
    pub fn resume_all(&self) {
        self.broadcast(Operation::Continue);
    }

    /// Stop every live runner. Each drains its in-flight entry, deregisters,
    /// and signals done.
    pub fn kill_all(&self) {
        self.broadcast(Operation::Kill);
    }

    fn broadcast(&self, operation: Operation) {
        let runners = self.runners.lock().unwrap();
        for control in runners.values() {
            // A full mailbox already has an operation pending; dropping the
            // duplicate keeps broadcast non-blocking.
            let _ = control.ops.try_send(operation);
        }
    }
}
