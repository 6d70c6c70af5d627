// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The registry context shared by listeners and notifiers.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Result;
use crate::event::EventKind;
use crate::registry::{DispatchReceipt, KeyTable, ListenerKey, Registry};
use crate::subscription::SubscriptionBuilder;

use super::BusConfig;

static GLOBAL: LazyLock<EventBus> = LazyLock::new(EventBus::new);

type AnyRegistry = Arc<dyn Any + Send + Sync>;

struct Inner {
    config: BusConfig,
    keys: KeyTable,
    registries: Mutex<HashMap<TypeId, AnyRegistry>>,
}

/// Registry context: one [`Registry`] per event kind, created on first use.
///
/// Cloning an `EventBus` is cheap; clones share the same registries.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// use notifier_lib::{EventBus, EventKind, Handler};
///
/// struct Reboot;
///
/// impl EventKind for Reboot {
///     type Args = bool;
/// }
///
/// #[derive(Default)]
/// struct Manager {
///     rebooted: AtomicBool,
/// }
///
/// impl Handler<Reboot> for Manager {
///     fn handle(&self, done: bool) {
///         self.rebooted.store(done, Ordering::SeqCst);
///     }
/// }
///
/// let bus = EventBus::new();
/// let manager = Arc::new(Manager::default());
/// let subscription = bus.subscribe(&manager).on::<Reboot>().build();
///
/// bus.notify::<Reboot>(true)?;
/// bus.wait::<Reboot>();
/// assert!(manager.rebooted.load(Ordering::SeqCst));
///
/// subscription.wait_all();
/// # Ok::<(), notifier_lib::Error>(())
/// ```
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Creates a bus with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Creates a bus with the given configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                keys: KeyTable::new(config.key_policy),
                config,
                registries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the process-wide bus used by [`dispatch`](crate::dispatch).
    ///
    /// It is created with the default configuration on first use and lives
    /// until the process exits.
    #[must_use]
    pub fn global() -> &'static EventBus {
        &GLOBAL
    }

    /// Returns the bus configuration.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Returns the registry for `E`, creating it on first use.
    #[must_use]
    pub fn registry<E: EventKind>(&self) -> Arc<Registry<E>> {
        let slot = Arc::clone(
            self.inner
                .registries
                .lock()
                .entry(TypeId::of::<E>())
                .or_insert_with(|| {
                    tracing::debug!(event = E::name(), "Creating registry");
                    let registry: AnyRegistry =
                        Arc::new(Registry::<E>::with_config(self.inner.config.clone()));
                    registry
                }),
        );
        slot.downcast::<Registry<E>>()
            .unwrap_or_else(|_| unreachable!("registry slot is keyed by its event kind"))
    }

    /// Returns the key the next subscription of listener type `L` gets.
    #[must_use]
    pub fn listener_key<L: 'static>(&self) -> ListenerKey {
        self.inner.keys.key_for::<L>()
    }

    /// Starts a subscription for `listener`.
    ///
    /// Shorthand for [`Subscription::builder`](crate::Subscription::builder).
    #[must_use]
    pub fn subscribe<L: Send + Sync + 'static>(&self, listener: &Arc<L>) -> SubscriptionBuilder<L> {
        SubscriptionBuilder::new(self, Arc::downgrade(listener))
    }

    /// Starts a subscription for a listener that is still being constructed.
    ///
    /// Use this from inside [`Arc::new_cyclic`] so a component can own its
    /// own subscription.
    #[must_use]
    pub fn subscribe_weak<L: Send + Sync + 'static>(&self, listener: Weak<L>) -> SubscriptionBuilder<L> {
        SubscriptionBuilder::new(self, listener)
    }

    /// Notifies every listener currently registered for `E`.
    ///
    /// Returns as soon as the dispatch is launched. See
    /// [`Registry::dispatch`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`](crate::Error::Spawn) if the dispatch worker
    /// could not be started.
    pub fn notify<E: EventKind>(&self, args: E::Args) -> Result<DispatchReceipt> {
        self.registry::<E>().dispatch(args)
    }

    /// Blocks until the most recent dispatch of `E` finishes.
    ///
    /// Returns immediately if none is pending.
    pub fn wait<E: EventKind>(&self) {
        self.registry::<E>().wait();
    }

    /// Like [`wait`](Self::wait), bounded by `timeout`.
    ///
    /// Returns `true` if no dispatch of `E` is running any more.
    #[must_use]
    pub fn wait_timeout<E: EventKind>(&self, timeout: Duration) -> bool {
        self.registry::<E>().wait_timeout(timeout)
    }

    /// Returns the number of event kinds used on this bus so far.
    #[must_use]
    pub fn kind_count(&self) -> usize {
        self.inner.registries.lock().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.inner.config)
            .field("kinds", &self.kind_count())
            .finish_non_exhaustive()
    }
}
