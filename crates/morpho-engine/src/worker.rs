//! Off-thread recompute with a single-slot mailbox.
//!
//! [`RecomputeWorker`] owns one background thread. Each
//! [`submit`](RecomputeWorker::submit) overwrites the pending request
//! and bumps a generation counter; the thread always takes the newest
//! request, and a result whose generation has been superseded by the
//! time it finishes is dropped. Slider drags that outpace the
//! transform therefore never queue up: only the final position is
//! guaranteed to be computed.
//!
//! State mutation stays on the caller's side. The worker only ever
//! sees snapshots.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use image::GrayImage;

use crate::engine::{EngineState, recompute};
use crate::registry::TransformRegistry;

/// A finished recompute, tagged with the submission it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutput {
    pub generation: u64,
    pub image: GrayImage,
}

#[derive(Default)]
struct Mailbox {
    /// Generation of the most recent submission. Zero before any.
    submitted: u64,
    pending: Option<(u64, EngineState)>,
    latest: Option<WorkerOutput>,
    shutdown: bool,
    /// The thread has exited, normally or by unwinding.
    stopped: bool,
}

#[derive(Default)]
struct Shared {
    mailbox: Mutex<Mailbox>,
    /// Signalled on submit and shutdown.
    request: Condvar,
    /// Signalled when a current result lands.
    result: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Background recompute thread with "latest request wins" semantics.
pub struct RecomputeWorker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl RecomputeWorker {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn<R>(registry: R) -> std::io::Result<Self>
    where
        R: TransformRegistry + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("morpho-recompute".to_owned())
            .spawn(move || run(&thread_shared, &registry))?;
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Queue `state` for recompute, replacing any request not yet
    /// picked up. Returns the generation assigned to it.
    pub fn submit(&self, state: EngineState) -> u64 {
        let mut mailbox = self.shared.lock();
        mailbox.submitted += 1;
        let generation = mailbox.submitted;
        if let Some((stale, _)) = mailbox.pending.replace((generation, state)) {
            tracing::trace!(stale, generation, "replaced pending recompute");
        }
        drop(mailbox);
        self.shared.request.notify_one();
        generation
    }

    /// Generation of the most recent submission, zero if none.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.lock().submitted
    }

    /// The newest finished result, without blocking.
    ///
    /// May be older than the latest submission.
    #[must_use]
    pub fn latest(&self) -> Option<WorkerOutput> {
        self.shared.lock().latest.clone()
    }

    /// Whether the worker thread has exited, e.g. because a transform
    /// panicked. A stopped worker never produces another result.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.lock().stopped
    }

    /// Block until the result for the most recent submission is ready.
    ///
    /// Returns `None` if nothing has been submitted yet, or if the
    /// worker thread stopped before producing that result.
    #[must_use]
    pub fn wait_latest(&self) -> Option<WorkerOutput> {
        let mut mailbox = self.shared.lock();
        if mailbox.submitted == 0 {
            return None;
        }
        loop {
            if let Some(out) = &mailbox.latest
                && out.generation == mailbox.submitted
            {
                return Some(out.clone());
            }
            if mailbox.stopped {
                return None;
            }
            mailbox = self
                .shared
                .result
                .wait(mailbox)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for RecomputeWorker {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.request.notify_all();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("recompute worker thread panicked");
        }
    }
}

/// Marks the worker stopped and wakes waiters when the thread exits,
/// including by unwinding out of a transform.
struct StopOnExit<'a>(&'a Shared);

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        self.0.lock().stopped = true;
        self.0.result.notify_all();
    }
}

fn run<R: TransformRegistry>(shared: &Shared, registry: &R) {
    let _stop = StopOnExit(shared);
    loop {
        let (generation, state) = {
            let mut mailbox = shared.lock();
            loop {
                if mailbox.shutdown {
                    return;
                }
                if let Some(request) = mailbox.pending.take() {
                    break request;
                }
                mailbox = shared
                    .request
                    .wait(mailbox)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let image = recompute(&state, registry);

        let mut mailbox = shared.lock();
        if generation == mailbox.submitted {
            mailbox.latest = Some(WorkerOutput { generation, image });
            drop(mailbox);
            shared.result.notify_all();
        } else {
            tracing::trace!(
                generation,
                current = mailbox.submitted,
                "discarding superseded recompute"
            );
        }
    }
}
