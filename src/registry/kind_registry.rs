// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per event kind listener registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::bus::BusConfig;
use crate::error::Result;
use crate::event::{EventKind, Handler};

use super::listener_key::ListenerKey;
use super::pending::{Completion, CompletionGuard, DispatchId, DispatchReceipt, PendingDispatch};

type Entry<E> = Weak<dyn Handler<E>>;

/// Listener registry for one event kind.
///
/// Maps a [`ListenerKey`] to a non-owning reference to the listener's
/// [`Handler`] and remembers the most recently launched dispatch.
///
/// # Thread Safety
///
/// Entries live behind a `parking_lot::RwLock` that is held only while the
/// map is mutated or snapshotted, never while handlers run. Two dispatches of
/// the same kind may run concurrently; the registry adds no locking around
/// handler execution.
pub struct Registry<E: EventKind> {
    entries: RwLock<HashMap<ListenerKey, Entry<E>>>,
    pending: Mutex<Option<PendingDispatch>>,
    next_dispatch: AtomicU64,
    config: BusConfig,
}

impl<E: EventKind> Registry<E> {
    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Creates an empty registry dispatching through `config`'s executor.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            pending: Mutex::new(None),
            next_dispatch: AtomicU64::new(1),
            config,
        }
    }

    /// Inserts `handler` under `key`, replacing any entry already there.
    pub fn register(&self, key: ListenerKey, handler: Weak<dyn Handler<E>>) {
        let replaced = self.entries.write().insert(key, handler).is_some();
        if replaced {
            tracing::debug!(event = E::name(), listener = %key, "Replaced listener entry");
        } else {
            tracing::debug!(event = E::name(), listener = %key, "Registered listener");
        }
    }

    /// Removes whatever entry currently sits under `key`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn unregister(&self, key: ListenerKey) -> bool {
        let removed = self.entries.write().remove(&key).is_some();
        if removed {
            tracing::debug!(event = E::name(), listener = %key, "Unregistered listener");
        }
        removed
    }

    /// Invokes every registered listener with `args` on a worker.
    ///
    /// The entry set is snapshotted before this returns; listeners registered
    /// afterwards are not part of this dispatch. Each entry is upgraded right
    /// before its handler runs, so a listener dropped in the meantime is
    /// skipped. Invocation order is unspecified.
    ///
    /// The new dispatch replaces the pending one. The previous dispatch is
    /// neither cancelled nor awaited; if it was still running, its ID is
    /// reported in [`DispatchReceipt::detached`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`](crate::Error::Spawn) if the dispatch thread
    /// could not be started. The pending dispatch is left untouched.
    ///
    /// An executor that accepts the task but drops it unrun (a tokio runtime
    /// that already shut down) is not an error here; the dispatch then ends
    /// as [`DispatchState::Abandoned`](crate::DispatchState::Abandoned).
    pub fn dispatch(&self, args: E::Args) -> Result<DispatchReceipt> {
        let snapshot: Vec<(ListenerKey, Entry<E>)> = self
            .entries
            .read()
            .iter()
            .map(|(key, entry)| (*key, entry.clone()))
            .collect();
        let listeners = snapshot.len();

        let id = DispatchId::new(self.next_dispatch.fetch_add(1, Ordering::Relaxed));
        let completion = Arc::new(Completion::new());
        let mut guard = CompletionGuard::new(Arc::clone(&completion), id, E::name());

        self.config
            .executor
            .spawn(self.config.thread_name(E::name()), move || {
                guard.enter();
                for (key, entry) in snapshot {
                    let Some(handler) = entry.upgrade() else {
                        tracing::trace!(event = E::name(), listener = %key, "Listener dropped, skipping");
                        continue;
                    };
                    tracing::trace!(event = E::name(), listener = %key, dispatch = %id, "Invoking listener");
                    handler.handle(args.clone());
                }
                drop(guard);
            })?;

        let previous = self
            .pending
            .lock()
            .replace(PendingDispatch::new(id, completion));
        let detached = previous.filter(|p| !p.is_finished()).map(|p| p.id());
        if let Some(detached) = detached {
            tracing::debug!(
                event = E::name(),
                dispatch = %id,
                detached = %detached,
                "Detached still running dispatch"
            );
        }

        tracing::trace!(event = E::name(), dispatch = %id, listeners, "Dispatch launched");
        Ok(DispatchReceipt {
            id,
            listeners,
            detached,
        })
    }

    /// Blocks until the pending dispatch completes.
    ///
    /// Returns immediately if nothing was ever dispatched or the last
    /// dispatch already completed. Dispatches detached by a later one are not
    /// waited for.
    pub fn wait(&self) {
        // Clone out so the lock is not held while blocking.
        let pending = self.pending.lock().clone();
        if let Some(pending) = pending {
            pending.wait();
        }
    }

    /// Like [`wait`](Self::wait), bounded by `timeout`.
    ///
    /// Returns `true` if no dispatch is running any more, or if called from
    /// the worker of the pending dispatch itself.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let pending = self.pending.lock().clone();
        pending.is_none_or(|pending| pending.wait_timeout(timeout))
    }

    /// Returns the most recently launched dispatch, if any.
    #[must_use]
    pub fn pending(&self) -> Option<PendingDispatch> {
        self.pending.lock().clone()
    }

    /// Returns `true` if an entry is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: ListenerKey) -> bool {
        self.entries.read().contains_key(&key)
    }

    /// Returns the number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: EventKind> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EventKind> std::fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("event", &E::name())
            .field("listeners", &self.len())
            .field("pending", &self.pending.lock().as_ref().map(PendingDispatch::id))
            .finish_non_exhaustive()
    }
}
