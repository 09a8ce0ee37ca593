// Runner - the concurrency and pacing core
//
// One Runner replays one archive end-to-end: a single long-lived dispatch
// task plus, at any moment, at most one short-lived per-entry task. The
// dispatch task owns the transform chain and is the only thing that rebuilds
// it; the chain travels to the per-entry task and comes back with the cursor,
// so entry i+1 always sees the transforms as updated by entry i's response.
//
// Control flows through a bounded mailbox (Pause / Continue / Kill) and a
// bounded cursor channel carrying the next entry index. Pausing disables the
// cursor branch without draining it: a pending advance waits in the channel
// until a Continue arrives. Kill is observed between entries - the in-flight
// entry completes, then the runner deregisters and signals done exactly once.

mod registry;

pub use registry::{Registry, RunnerId};

use registry::RunnerControl;

use crate::error::ReplayError;
use crate::executor::Executor;
use crate::har::{Entry, Har};
use crate::transform::{self, RequestTransform};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Control messages accepted by a running replay, ordered FIFO per mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Hold the cursor: the in-flight entry finishes, the next won't start.
    Pause,
    /// Release the cursor. Has no effect on a runner that isn't paused.
    Continue,
    /// Drain, deregister, and signal done.
    Kill,
}

/// Cursor message: the next entry to dispatch, plus the request-side chain as
/// rebuilt from the previous entry's response.
struct Advance {
    index: usize,
    chain: Vec<Arc<dyn RequestTransform>>,
}

/// Room for a few queued control messages; a full mailbox means an
/// equivalent operation is already pending.
const MAILBOX_CAPACITY: usize = 16;

/// Replays one archive at a paced rhythm through an executor.
///
/// Created stopped; `run()` starts it. The caller keeps the Runner around for
/// control (pause/resume/kill) and waits on `done()` before dropping it.
pub struct Runner {
    archive: Arc<Har>,
    executor: Arc<dyn Executor>,
    velocity: f64,
    id: RunnerId,
    registry: Registry,
    running: Arc<Mutex<bool>>,
    ops_tx: mpsc::Sender<Operation>,
    ops_rx: Mutex<Option<mpsc::Receiver<Operation>>>,
    cursor_tx: mpsc::Sender<Advance>,
    cursor_rx: Mutex<Option<mpsc::Receiver<Advance>>>,
    chain: Mutex<Option<Vec<Arc<dyn RequestTransform>>>>,
    done_tx: Mutex<Option<watch::Sender<bool>>>,
    done_rx: watch::Receiver<bool>,
}

impl Runner {
    /// Build a stopped runner. Velocity scales the recorded rhythm: 1.0
    /// replays at recorded speed, 2.0 twice as fast. Anything that isn't a
    /// positive finite number is a configuration error.
    pub fn new(
        archive: Arc<Har>,
        executor: Arc<dyn Executor>,
        transforms: Vec<Arc<dyn RequestTransform>>,
        velocity: f64,
        registry: Registry,
    ) -> Result<Self, ReplayError> {
        if !velocity.is_finite() || velocity <= 0.0 {
            return Err(ReplayError::InvalidVelocity(velocity));
        }

        let (ops_tx, ops_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (cursor_tx, cursor_rx) = mpsc::channel(1);
        let (done_tx, done_rx) = watch::channel(false);

        Ok(Self {
            archive,
            executor,
            velocity,
            id: RunnerId::next(),
            registry,
            running: Arc::new(Mutex::new(false)),
            ops_tx,
            ops_rx: Mutex::new(Some(ops_rx)),
            cursor_tx,
            cursor_rx: Mutex::new(Some(cursor_rx)),
            chain: Mutex::new(Some(transforms)),
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
        })
    }

    pub fn id(&self) -> RunnerId {
        self.id
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    /// Start the replay. Registers in the registry, enqueues the first entry,
    /// and spawns the dispatch task. Fails with `AlreadyRunning` if this
    /// runner is already registered or has already run to completion.
    pub fn run(&self) -> Result<(), ReplayError> {
        self.registry.register(
            self.id,
            RunnerControl {
                ops: self.ops_tx.clone(),
            },
        )?;

        // A runner that already finished has consumed its channels; it can't
        // be restarted, only recreated.
        let taken = (
            self.ops_rx.lock().unwrap().take(),
            self.cursor_rx.lock().unwrap().take(),
            self.chain.lock().unwrap().take(),
            self.done_tx.lock().unwrap().take(),
        );
        let (Some(ops_rx), Some(cursor_rx), Some(chain), Some(done_tx)) = taken else {
            self.registry.deregister(self.id);
            return Err(ReplayError::AlreadyRunning);
        };

        *self.running.lock().unwrap() = true;
        tracing::info!(id = %self.id, archive = %self.archive.name, entries = self.archive.entries.len(), "starting replay");

        // Enqueue processing of the first entry with the initial chain.
        let _ = self.cursor_tx.try_send(Advance { index: 0, chain });

        let dispatch = Dispatch {
            archive: self.archive.clone(),
            executor: self.executor.clone(),
            velocity: self.velocity,
            start_time: Instant::now(),
            id: self.id,
            registry: self.registry.clone(),
            running: self.running.clone(),
            ops_tx: self.ops_tx.clone(),
            cursor_tx: self.cursor_tx.clone(),
            done_tx,
        };
        tokio::spawn(dispatch.run(ops_rx, cursor_rx));
        Ok(())
    }

    /// Ask the runner to hold after the in-flight entry. Idempotent.
    pub fn pause(&self) {
        let _ = self.ops_tx.try_send(Operation::Pause);
    }

    /// Release a paused runner. Idempotent.
    pub fn resume(&self) {
        let _ = self.ops_tx.try_send(Operation::Continue);
    }

    /// Stop the runner. The in-flight entry completes, then the runner
    /// deregisters and signals done. Idempotent in effect.
    pub fn kill(&self) {
        let _ = self.ops_tx.try_send(Operation::Kill);
    }

    /// One-shot completion signal: flips to true after the dispatch loop has
    /// removed this runner from the registry.
    pub fn done_signal(&self) -> watch::Receiver<bool> {
        self.done_rx.clone()
    }

    /// Wait until the runner has stopped (normally or via Kill).
    pub async fn done(&self) {
        let mut signal = self.done_rx.clone();
        while !*signal.borrow_and_update() {
            if signal.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Everything the dispatch task owns once the runner has started.
struct Dispatch {
    archive: Arc<Har>,
    executor: Arc<dyn Executor>,
    velocity: f64,
    start_time: Instant,
    id: RunnerId,
    registry: Registry,
    running: Arc<Mutex<bool>>,
    ops_tx: mpsc::Sender<Operation>,
    cursor_tx: mpsc::Sender<Advance>,
    done_tx: watch::Sender<bool>,
}

impl Dispatch {
    async fn run(
        self,
        mut ops_rx: mpsc::Receiver<Operation>,
        mut cursor_rx: mpsc::Receiver<Advance>,
    ) {
        loop {
            let running = *self.running.lock().unwrap();
            tokio::select! {
                biased;

                operation = ops_rx.recv() => {
                    // recv() yielding None means every handle to this runner
                    // is gone; treat it like a Kill so the task can't leak.
                    match operation.unwrap_or(Operation::Kill) {
                        Operation::Pause => *self.running.lock().unwrap() = false,
                        Operation::Continue => *self.running.lock().unwrap() = true,
                        Operation::Kill => {
                            self.shut_down();
                            return;
                        }
                    }
                }

                // While paused this branch is disabled: a pending advance
                // stays queued instead of being dropped.
                advance = cursor_rx.recv(), if running => {
                    let Some(Advance { index, chain }) = advance else {
                        self.shut_down();
                        return;
                    };
                    if index >= self.archive.entries.len() {
                        // Terminal condition: route shutdown through the
                        // mailbox so it lines up behind pending control
                        // messages. If the mailbox is packed, stop directly.
                        if self.ops_tx.try_send(Operation::Kill).is_err() {
                            self.shut_down();
                            return;
                        }
                    } else {
                        self.play(index, chain);
                    }
                }
            }
        }
    }

    fn shut_down(&self) {
        *self.running.lock().unwrap() = false;
        self.registry.deregister(self.id);
        let _ = self.done_tx.send(true);
        tracing::info!(id = %self.id, "replay stopped");
    }

    /// Spawn the per-entry task. It owns the chain while it works and hands
    /// it back on the cursor together with the next index, so the dispatch
    /// loop never pipelines two entries.
    fn play(&self, index: usize, chain: Vec<Arc<dyn RequestTransform>>) {
        let entry = self.archive.entries[index].clone();
        let executor = self.executor.clone();
        let cursor_tx = self.cursor_tx.clone();
        let deadline = self.pacing_deadline(index + 1);

        tokio::spawn(async move {
            let chain = play_entry(&entry, executor.as_ref(), chain).await;
            if let Some(deadline) = deadline {
                tokio::time::sleep_until(deadline).await;
            }
            // The dispatch loop may already be gone (killed); that's fine.
            let _ = cursor_tx
                .send(Advance {
                    index: index + 1,
                    chain,
                })
                .await;
        });
    }

    /// Wall-clock deadline for dispatching entry `index`: the start time plus
    /// the entry's recorded offset divided by velocity. Replay preserves the
    /// recorded rhythm regardless of how long the live requests take - a slow
    /// request eats into the next sleep, a fast one waits the gap out.
    fn pacing_deadline(&self, index: usize) -> Option<Instant> {
        let entry = self.archive.entries.get(index)?;
        Some(self.start_time + scaled_offset(entry.time, self.velocity))
    }
}

/// The entry's recorded offset scaled by velocity, clamped to something
/// `Duration` can hold. Archives with garbage times pace as zero.
fn scaled_offset(time_ms: f64, velocity: f64) -> Duration {
    let seconds = time_ms / velocity / 1000.0;
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds.min(u32::MAX as f64))
    } else {
        Duration::ZERO
    }
}

/// Replay a single entry: apply the request-side chain to a fresh copy of the
/// recorded request, dispatch by verb, and rebuild the chain from the live
/// response. Returns the chain to use for the next entry.
async fn play_entry(
    entry: &Entry,
    executor: &dyn Executor,
    chain: Vec<Arc<dyn RequestTransform>>,
) -> Vec<Arc<dyn RequestTransform>> {
    // Transforms mutate their argument, so each attempt works on a copy; the
    // archive itself is shared read-only across runners.
    let mut request = entry.request.clone();
    let observers = transform::apply_all(&chain, &mut request);

    let result = match request.method.as_str() {
        "GET" => executor.get(&request).await,
        "POST" => executor.post(&request).await,
        "PUT" => executor.put(&request).await,
        "DELETE" => executor.delete(&request).await,
        "HEAD" => executor.head(&request).await,
        "PATCH" => executor.patch(&request).await,
        other => {
            tracing::warn!(url = %request.url, "{}", ReplayError::UnknownVerb(other.to_string()));
            return chain;
        }
    };

    match result {
        // The live response rebuilds the request-side chain for entry i+1.
        Ok(response) => transform::observe_all(&observers, &response),
        // No response object at all: record it and keep the chain we had.
        Err(err) => {
            tracing::warn!(url = %request.url, error = %err, "executor failure, moving on");
            chain
        }
    }
}
