//! Single-flight coordinator for expensive per-frame computations.
//!
//! At most one computation runs at a time. A request that arrives while one is
//! in flight is not queued: only the fact that something newer exists is
//! remembered. When the running computation finishes, its result is published
//! and, if a newer request was seen, exactly one more run is launched with the
//! region/frame state sampled *at that moment*. Intermediate requests are
//! dropped, so the pipeline depth is bounded to one regardless of how fast the
//! UI fires change notifications.
//!
//! # Threading
//!
//! - `request()` may be called from any thread; it never blocks on the computation.
//! - The computation runs on the Tokio blocking pool (`spawn_blocking`).
//! - Completions are published from a runtime worker via [`EventBus`], in
//!   subscriber registration order.
//! - `busy`/`pending` live under one `parking_lot::Mutex`, so a request racing a
//!   completion is either folded into `pending` before the completion checks it,
//!   or handled as a fresh request afterwards.
//!
//! No cancellation: an in-flight computation always runs to completion.
//! A panicking computation or completion observer is logged and the flight
//! still settles, including any pending replay.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use roi_core::{EventBus, SubscriptionId};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, error, trace};

use crate::error::ProcessorError;

type Sampler<I> = Arc<dyn Fn() -> Option<I> + Send + Sync>;
type Compute<I, O> = Arc<dyn Fn(I) -> O + Send + Sync>;

/// What happened to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// No computation was running; one was launched with the given input.
    Started,
    /// A computation is running; the request was folded into the pending flag.
    Coalesced,
}

/// Result of one finished computation.
#[derive(Debug, Clone)]
pub struct Completion<O> {
    /// 1-based run number (launch order)
    pub run: u64,
    /// Computed value
    pub output: O,
}

/// Counters for observing coalescing behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlightMetrics {
    /// Computations launched
    pub started: u64,
    /// Computations that delivered a result
    pub completed: u64,
    /// Computations that panicked
    pub failed: u64,
    /// Requests folded into the pending flag
    pub coalesced: u64,
}

#[derive(Debug, Default)]
struct FlightFlags {
    busy: bool,
    pending: bool,
}

struct Shared<I, O> {
    flags: Mutex<FlightFlags>,
    idle_tx: watch::Sender<bool>,
    sampler: Sampler<I>,
    compute: Compute<I, O>,
    completions: EventBus<Completion<O>>,
    runtime: Handle,
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    coalesced: AtomicU64,
}

/// Single-flight processor from inputs `I` to results `O`.
///
/// Cloning is cheap; clones share the same flags and subscribers.
pub struct SingleFlight<I, O> {
    shared: Arc<Shared<I, O>>,
}

impl<I, O> Clone for SingleFlight<I, O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<I, O> std::fmt::Debug for SingleFlight<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = self.shared.flags.lock();
        f.debug_struct("SingleFlight")
            .field("busy", &flags.busy)
            .field("pending", &flags.pending)
            .finish()
    }
}

impl<I, O> SingleFlight<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Create a processor that spawns onto `runtime`.
    ///
    /// `sampler` reads the *current* input (region + frame) and is called when a
    /// coalesced request is replayed. Returning `None` means there is nothing to
    /// compute and the processor goes idle.
    pub fn new<S, C>(runtime: Handle, sampler: S, compute: C) -> Self
    where
        S: Fn() -> Option<I> + Send + Sync + 'static,
        C: Fn(I) -> O + Send + Sync + 'static,
    {
        let (idle_tx, _) = watch::channel(true);
        Self {
            shared: Arc::new(Shared {
                flags: Mutex::new(FlightFlags::default()),
                idle_tx,
                sampler: Arc::new(sampler),
                compute: Arc::new(compute),
                completions: EventBus::new(),
                runtime,
                started: AtomicU64::new(0),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
            }),
        }
    }

    /// Create a processor on the runtime the caller is running in.
    pub fn on_current_runtime<S, C>(sampler: S, compute: C) -> Result<Self, ProcessorError>
    where
        S: Fn() -> Option<I> + Send + Sync + 'static,
        C: Fn(I) -> O + Send + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| ProcessorError::NoRuntime)?;
        Ok(Self::new(runtime, sampler, compute))
    }

    /// Ask for a fresh result.
    ///
    /// Starts a computation on `input` when idle. When busy, only marks that a
    /// newer request exists; `input` is dropped and the replay re-samples.
    pub fn request(&self, input: I) -> RequestOutcome {
        {
            let mut flags = self.shared.flags.lock();
            if flags.busy {
                if !flags.pending {
                    debug!("Computation in flight, coalescing request");
                }
                flags.pending = true;
                self.shared.coalesced.fetch_add(1, Ordering::Relaxed);
                return RequestOutcome::Coalesced;
            }
            flags.busy = true;
            self.shared.idle_tx.send_replace(false);
        }
        Shared::launch(&self.shared, input);
        RequestOutcome::Started
    }

    /// Request using the sampler's current input.
    ///
    /// Returns `None` without touching any state when there is nothing to sample.
    pub fn request_current(&self) -> Option<RequestOutcome> {
        (self.shared.sampler)().map(|input| self.request(input))
    }

    /// Register a completion observer.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Completion<O>) + Send + Sync + 'static,
    {
        self.shared.completions.subscribe(callback)
    }

    /// Remove a completion observer.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.completions.unsubscribe(id)
    }

    /// Whether a computation is currently executing.
    pub fn is_busy(&self) -> bool {
        self.shared.flags.lock().busy
    }

    /// Wait until no computation is running and none is pending.
    pub async fn idle(&self) {
        let mut rx = self.shared.idle_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|idle| *idle).await;
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> FlightMetrics {
        let s = &self.shared;
        FlightMetrics {
            started: s.started.load(Ordering::Relaxed),
            completed: s.completed.load(Ordering::Relaxed),
            failed: s.failed.load(Ordering::Relaxed),
            coalesced: s.coalesced.load(Ordering::Relaxed),
        }
    }
}

impl<I, O> Shared<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn launch(this: &Arc<Self>, input: I) {
        let run = this.started.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(run, "Launching computation");
        let shared = Arc::clone(this);
        let compute = Arc::clone(&this.compute);
        this.runtime.spawn(async move {
            let result = tokio::task::spawn_blocking(move || compute(input)).await;
            Shared::complete(&shared, run, result);
        });
    }

    fn complete(this: &Arc<Self>, run: u64, result: Result<O, JoinError>) {
        match result {
            Ok(output) => {
                this.completed.fetch_add(1, Ordering::Relaxed);
                let completion = Completion { run, output };
                let published =
                    panic::catch_unwind(AssertUnwindSafe(|| this.completions.publish(&completion)));
                if published.is_err() {
                    error!(run, "Completion observer panicked");
                }
            }
            Err(e) => {
                this.failed.fetch_add(1, Ordering::Relaxed);
                error!(run, error = %e, "Frame computation failed");
            }
        }

        loop {
            {
                let mut flags = this.flags.lock();
                if !flags.pending {
                    flags.busy = false;
                    this.idle_tx.send_replace(true);
                    return;
                }
                flags.pending = false;
            }
            match (this.sampler)() {
                Some(input) => {
                    debug!(after = run, "Replaying coalesced request with current state");
                    Shared::launch(this, input);
                    return;
                }
                // Nothing to sample. Settle unless another request arrived meanwhile.
                None => continue,
            }
        }
    }
}
