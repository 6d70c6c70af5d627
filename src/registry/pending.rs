// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-flight dispatch tracking.
//!
//! Every dispatch owns a [`Completion`] shared between the worker running it
//! and the registry slot that waiters look at. The worker holds a
//! [`CompletionGuard`]; dropping the guard, whether normally or while
//! unwinding from a handler panic, is what releases the waiters. A guard
//! dropped before the worker entered it means the task never ran.

use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Identifier of one dispatch, unique within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DispatchId(u64);

impl DispatchId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DispatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dispatch({})", self.0)
    }
}

/// Lifecycle state of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Launched and not yet finished.
    Running,
    /// Every snapshotted listener was visited.
    Finished,
    /// A handler panicked; the remaining listeners were not invoked.
    Panicked,
    /// The worker never started; no listener was invoked.
    ///
    /// Happens when the executor discards the task, e.g. a tokio runtime
    /// that shut down before the blocking pool picked it up.
    Abandoned,
}

/// What [`Registry::dispatch`](crate::Registry::dispatch) reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// The dispatch that was launched.
    pub id: DispatchId,
    /// Number of entries in the snapshot taken for this dispatch.
    pub listeners: usize,
    /// The previous dispatch, if it was still running when it got replaced.
    ///
    /// A detached dispatch keeps running but can no longer be joined.
    pub detached: Option<DispatchId>,
}

#[derive(Debug)]
pub(crate) struct Completion {
    state: Mutex<DispatchState>,
    worker: Mutex<Option<ThreadId>>,
    done: Condvar,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(DispatchState::Running),
            worker: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn state(&self) -> DispatchState {
        *self.state.lock()
    }

    fn finish(&self, state: DispatchState) {
        *self.state.lock() = state;
        self.done.notify_all();
    }

    fn is_worker_thread(&self) -> bool {
        *self.worker.lock() == Some(thread::current().id())
    }

    fn wait(&self) {
        let mut state = self.state.lock();
        while *state == DispatchState::Running {
            self.done.wait(&mut state);
        }
    }

    fn wait_until(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        while *state == DispatchState::Running {
            if self.done.wait_until(&mut state, deadline).timed_out() {
                return *state != DispatchState::Running;
            }
        }
        true
    }
}

/// Held by the worker for the duration of a dispatch.
pub(crate) struct CompletionGuard {
    completion: Arc<Completion>,
    id: DispatchId,
    kind: &'static str,
    entered: bool,
}

impl CompletionGuard {
    pub(crate) fn new(completion: Arc<Completion>, id: DispatchId, kind: &'static str) -> Self {
        Self {
            completion,
            id,
            kind,
            entered: false,
        }
    }

    /// Marks the calling thread as the one running this dispatch.
    pub(crate) fn enter(&mut self) {
        *self.completion.worker.lock() = Some(thread::current().id());
        self.entered = true;
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.entered {
            tracing::error!(
                event = self.kind,
                dispatch = %self.id,
                "Dispatch task was dropped before it ran, no listener was notified"
            );
            self.completion.finish(DispatchState::Abandoned);
        } else if thread::panicking() {
            tracing::error!(
                event = self.kind,
                dispatch = %self.id,
                "Handler panicked, remaining listeners of this dispatch were skipped"
            );
            self.completion.finish(DispatchState::Panicked);
        } else {
            self.completion.finish(DispatchState::Finished);
        }
    }
}

/// Handle to the most recently launched dispatch of one event kind.
#[derive(Debug, Clone)]
pub struct PendingDispatch {
    id: DispatchId,
    completion: Arc<Completion>,
}

impl PendingDispatch {
    pub(crate) fn new(id: DispatchId, completion: Arc<Completion>) -> Self {
        Self { id, completion }
    }

    /// Returns the dispatch ID.
    #[must_use]
    pub fn id(&self) -> DispatchId {
        self.id
    }

    /// Returns the current state of the dispatch.
    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.completion.state()
    }

    /// Returns `true` once the dispatch is no longer running, whatever the
    /// outcome.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state() != DispatchState::Running
    }

    /// Blocks until the dispatch is no longer running.
    ///
    /// Returns immediately when called from the worker running this very
    /// dispatch, which would otherwise wait on itself forever.
    pub fn wait(&self) {
        if self.completion.is_worker_thread() {
            tracing::debug!(dispatch = %self.id, "Skipping wait on own dispatch");
            return;
        }
        self.completion.wait();
    }

    /// Like [`wait`](Self::wait), bounded by `timeout`.
    ///
    /// Returns `true` if the dispatch is no longer running. From the worker
    /// running this very dispatch it returns `true` right away, the same way
    /// [`wait`](Self::wait) returns: nothing is left for that caller to join.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.completion.is_worker_thread() {
            tracing::debug!(dispatch = %self.id, "Skipping wait on own dispatch");
            return true;
        }
        self.completion.wait_until(Instant::now() + timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: u64) -> (PendingDispatch, CompletionGuard) {
        let completion = Arc::new(Completion::new());
        let id = DispatchId::new(id);
        let guard = CompletionGuard::new(Arc::clone(&completion), id, "Test");
        (PendingDispatch::new(id, completion), guard)
    }

    #[test]
    fn dispatch_id_display() {
        assert_eq!(DispatchId::new(4).to_string(), "Dispatch(4)");
    }

    #[test]
    fn dispatch_id_ordering() {
        assert!(DispatchId::new(1) < DispatchId::new(2));
    }

    #[test]
    fn new_dispatch_is_running() {
        let (pending, _guard) = pending(1);
        assert_eq!(pending.state(), DispatchState::Running);
        assert!(!pending.is_finished());
    }

    #[test]
    fn dropping_entered_guard_finishes() {
        let (pending, mut guard) = pending(1);
        guard.enter();
        drop(guard);

        assert_eq!(pending.state(), DispatchState::Finished);
        pending.wait();
    }

    #[test]
    fn guard_dropped_before_enter_is_abandoned() {
        let (pending, guard) = pending(1);
        drop(guard);

        assert_eq!(pending.state(), DispatchState::Abandoned);
        assert!(pending.is_finished());
        assert!(pending.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn wait_timeout_expires_while_running() {
        let (pending, _guard) = pending(1);
        assert!(!pending.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn wait_blocks_until_guard_dropped() {
        let (pending, mut guard) = pending(1);

        let worker = thread::spawn(move || {
            guard.enter();
            thread::sleep(Duration::from_millis(50));
            drop(guard);
        });

        pending.wait();
        assert!(pending.is_finished());
        worker.join().unwrap();
    }

    #[test]
    fn panic_marks_dispatch_panicked() {
        let (pending, guard) = pending(1);

        let worker = thread::spawn(move || {
            let mut guard = guard;
            guard.enter();
            panic!("handler failure");
        });

        assert!(worker.join().is_err());
        assert_eq!(pending.state(), DispatchState::Panicked);
        assert!(pending.is_finished());
    }

    #[test]
    fn wait_from_worker_thread_returns() {
        let (pending, mut guard) = pending(1);

        let worker = thread::spawn(move || {
            guard.enter();
            pending.wait();
            let joined = pending.wait_timeout(Duration::from_secs(5));
            (joined, pending.is_finished())
        });

        // Reported as joined even though the worker still holds the guard.
        assert_eq!(worker.join().unwrap(), (true, false));
    }
}
