// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scoped subscriptions.

use std::any::TypeId;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crate::bus::EventBus;
use crate::event::{EventKind, Handler};
use crate::registry::ListenerKey;

use super::binding::{Binding, KindBinding};

/// Registration of one listener into a set of event kinds.
///
/// Building a subscription registers the listener under its
/// [`ListenerKey`] in the registry of every chosen kind; dropping it removes
/// the entry under that key from each of them. The subscription never owns
/// the listener.
///
/// Dropping a subscription does not wait for in-flight dispatches. Call
/// [`wait_all`](Self::wait_all) first when the listener's side effects must
/// be complete before teardown continues.
///
/// # Examples
///
/// A component owning its own subscription:
///
/// ```
/// use std::sync::Arc;
///
/// use notifier_lib::{EventBus, EventKind, Handler, Subscription};
///
/// struct Reboot;
///
/// impl EventKind for Reboot {
///     type Args = bool;
/// }
///
/// struct Coordinator {
///     subscription: Subscription,
/// }
///
/// impl Coordinator {
///     fn new(bus: &EventBus) -> Arc<Self> {
///         Arc::new_cyclic(|me| Self {
///             subscription: Subscription::builder_weak(bus, me.clone())
///                 .on::<Reboot>()
///                 .build(),
///         })
///     }
/// }
///
/// impl Handler<Reboot> for Coordinator {
///     fn handle(&self, _done: bool) {}
/// }
///
/// impl Drop for Coordinator {
///     fn drop(&mut self) {
///         self.subscription.wait_all();
///     }
/// }
///
/// let bus = EventBus::new();
/// let coordinator = Coordinator::new(&bus);
/// assert_eq!(bus.registry::<Reboot>().len(), 1);
///
/// drop(coordinator);
/// assert!(bus.registry::<Reboot>().is_empty());
/// ```
pub struct Subscription {
    key: ListenerKey,
    bindings: Vec<Box<dyn KindBinding>>,
}

impl Subscription {
    /// Starts a subscription for `listener` on `bus`.
    #[must_use]
    pub fn builder<L: Send + Sync + 'static>(
        bus: &EventBus,
        listener: &Arc<L>,
    ) -> SubscriptionBuilder<L> {
        SubscriptionBuilder::new(bus, Arc::downgrade(listener))
    }

    /// Starts a subscription from a weak reference.
    ///
    /// Intended for [`Arc::new_cyclic`], where the listener is not yet
    /// reachable through an `Arc`.
    #[must_use]
    pub fn builder_weak<L: Send + Sync + 'static>(
        bus: &EventBus,
        listener: Weak<L>,
    ) -> SubscriptionBuilder<L> {
        SubscriptionBuilder::new(bus, listener)
    }

    /// Returns the key the listener is registered under.
    #[must_use]
    pub fn key(&self) -> ListenerKey {
        self.key
    }

    /// Returns the names of the subscribed event kinds, in subscription order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.bindings.iter().map(|b| b.kind_name()).collect()
    }

    /// Returns `true` if this subscription covers `E`.
    #[must_use]
    pub fn covers<E: EventKind>(&self) -> bool {
        self.bindings
            .iter()
            .any(|b| b.kind_id() == TypeId::of::<E>())
    }

    /// Waits for the pending dispatch of every subscribed kind.
    pub fn wait_all(&self) {
        for binding in &self.bindings {
            binding.wait();
        }
    }

    /// Like [`wait_all`](Self::wait_all), with one deadline for all kinds.
    ///
    /// Returns `true` if no dispatch of any subscribed kind is still running.
    #[must_use]
    pub fn wait_all_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.bindings.iter().all(|binding| {
            binding.wait_timeout(deadline.saturating_duration_since(Instant::now()))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for binding in &self.bindings {
            if !binding.unregister(self.key) {
                tracing::trace!(
                    event = binding.kind_name(),
                    listener = %self.key,
                    "Entry already gone at unsubscribe"
                );
            }
        }
        tracing::debug!(listener = %self.key, kinds = self.bindings.len(), "Subscription dropped");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Collects the event kinds a listener handles.
///
/// Nothing is registered until [`build`](Self::build) is called.
#[must_use = "a subscription builder registers nothing until `build` is called"]
pub struct SubscriptionBuilder<L> {
    bus: EventBus,
    listener: Weak<L>,
    bindings: Vec<Box<dyn KindBinding>>,
}

impl<L: Send + Sync + 'static> SubscriptionBuilder<L> {
    pub(crate) fn new(bus: &EventBus, listener: Weak<L>) -> Self {
        Self {
            bus: bus.clone(),
            listener,
            bindings: Vec::new(),
        }
    }

    /// Adds event kind `E`. Adding the same kind twice has no effect.
    pub fn on<E: EventKind>(mut self) -> Self
    where
        L: Handler<E>,
    {
        if self
            .bindings
            .iter()
            .any(|b| b.kind_id() == TypeId::of::<E>())
        {
            return self;
        }
        let registry = self.bus.registry::<E>();
        self.bindings
            .push(Box::new(Binding::new(registry, self.listener.clone())));
        self
    }

    /// Registers the listener into every chosen kind.
    #[must_use = "dropping the subscription unregisters the listener immediately"]
    pub fn build(self) -> Subscription {
        let key = self.bus.listener_key::<L>();
        for binding in &self.bindings {
            binding.register(key);
        }
        tracing::debug!(listener = %key, kinds = self.bindings.len(), "Subscription created");
        Subscription {
            key,
            bindings: self.bindings,
        }
    }
}

impl<L> std::fmt::Debug for SubscriptionBuilder<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<_> = self.bindings.iter().map(|b| b.kind_name()).collect();
        f.debug_struct("SubscriptionBuilder")
            .field("kinds", &kinds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusConfig, KeyPolicy};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    struct Reboot;

    impl EventKind for Reboot {
        type Args = bool;
    }

    struct Boot;

    impl EventKind for Boot {
        type Args = i32;
    }

    #[derive(Default)]
    struct Manager {
        reboots: AtomicU32,
        boots: Mutex<Vec<i32>>,
    }

    impl Handler<Reboot> for Manager {
        fn handle(&self, _done: bool) {
            self.reboots.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Handler<Boot> for Manager {
        fn handle(&self, stage: i32) {
            self.boots.lock().push(stage);
        }
    }

    struct Slow;

    impl Handler<Reboot> for Slow {
        fn handle(&self, _done: bool) {
            thread::sleep(Duration::from_millis(200));
        }
    }

    #[test]
    fn build_registers_every_kind() {
        let bus = EventBus::new();
        let manager = Arc::new(Manager::default());

        let subscription = Subscription::builder(&bus, &manager)
            .on::<Reboot>()
            .on::<Boot>()
            .build();

        assert!(bus.registry::<Reboot>().contains(subscription.key()));
        assert!(bus.registry::<Boot>().contains(subscription.key()));
        assert_eq!(subscription.kinds(), vec!["Reboot", "Boot"]);
        assert!(subscription.covers::<Boot>());
    }

    #[test]
    fn builder_registers_nothing_until_build() {
        let bus = EventBus::new();
        let manager = Arc::new(Manager::default());

        let builder = bus.subscribe(&manager).on::<Reboot>();
        assert!(bus.registry::<Reboot>().is_empty());

        let _subscription = builder.build();
        assert_eq!(bus.registry::<Reboot>().len(), 1);
    }

    #[test]
    fn duplicate_kind_is_ignored() {
        let bus = EventBus::new();
        let manager = Arc::new(Manager::default());

        let subscription = bus.subscribe(&manager).on::<Reboot>().on::<Reboot>().build();

        assert_eq!(subscription.kinds(), vec!["Reboot"]);
    }

    #[test]
    fn drop_unregisters_every_kind() {
        let bus = EventBus::new();
        let manager = Arc::new(Manager::default());
        let subscription = bus.subscribe(&manager).on::<Reboot>().on::<Boot>().build();

        drop(subscription);

        assert!(bus.registry::<Reboot>().is_empty());
        assert!(bus.registry::<Boot>().is_empty());
    }

    #[test]
    fn dispatch_reaches_each_kind_handler() {
        let bus = EventBus::new();
        let manager = Arc::new(Manager::default());
        let subscription = bus.subscribe(&manager).on::<Reboot>().on::<Boot>().build();

        bus.notify::<Reboot>(true).unwrap();
        bus.notify::<Boot>(7).unwrap();
        subscription.wait_all();

        assert_eq!(manager.reboots.load(Ordering::SeqCst), 1);
        assert_eq!(*manager.boots.lock(), vec![7]);
    }

    #[test]
    fn same_type_overwrites_earlier_instance() {
        let bus = EventBus::new();
        let first = Arc::new(Manager::default());
        let second = Arc::new(Manager::default());

        let first_sub = bus.subscribe(&first).on::<Reboot>().build();
        let second_sub = bus.subscribe(&second).on::<Reboot>().build();
        assert_eq!(first_sub.key(), second_sub.key());

        bus.notify::<Reboot>(true).unwrap();
        bus.wait::<Reboot>();

        assert_eq!(first.reboots.load(Ordering::SeqCst), 0);
        assert_eq!(second.reboots.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_overwritten_subscription_removes_live_entry() {
        let bus = EventBus::new();
        let first = Arc::new(Manager::default());
        let second = Arc::new(Manager::default());

        let first_sub = bus.subscribe(&first).on::<Reboot>().build();
        let _second_sub = bus.subscribe(&second).on::<Reboot>().build();
        drop(first_sub);

        assert!(bus.registry::<Reboot>().is_empty());
        bus.notify::<Reboot>(true).unwrap();
        bus.wait::<Reboot>();
        assert_eq!(second.reboots.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn per_instance_keys_keep_both_instances() {
        let bus = EventBus::with_config(BusConfig::default().with_key_policy(KeyPolicy::PerInstance));
        let first = Arc::new(Manager::default());
        let second = Arc::new(Manager::default());

        let first_sub = bus.subscribe(&first).on::<Reboot>().build();
        let _second_sub = bus.subscribe(&second).on::<Reboot>().build();

        bus.notify::<Reboot>(true).unwrap();
        bus.wait::<Reboot>();
        assert_eq!(first.reboots.load(Ordering::SeqCst), 1);
        assert_eq!(second.reboots.load(Ordering::SeqCst), 1);

        drop(first_sub);
        assert_eq!(bus.registry::<Reboot>().len(), 1);
    }

    #[test]
    fn wait_all_timeout_bounds_slow_dispatch() {
        let bus = EventBus::new();
        let slow = Arc::new(Slow);
        let subscription = bus.subscribe(&slow).on::<Reboot>().build();

        bus.notify::<Reboot>(true).unwrap();

        assert!(!subscription.wait_all_timeout(Duration::from_millis(10)));
        assert!(subscription.wait_all_timeout(Duration::from_secs(10)));
    }

    #[test]
    fn cyclic_owner_unregisters_on_drop() {
        struct Owner {
            hits: AtomicU32,
            subscription: Option<Subscription>,
        }

        impl Handler<Reboot> for Owner {
            fn handle(&self, _done: bool) {
                self.hits.fetch_add(1, Ordering::SeqCst);
            }
        }

        let bus = EventBus::new();
        let owner = Arc::new_cyclic(|me: &Weak<Owner>| Owner {
            hits: AtomicU32::new(0),
            subscription: Some(bus.subscribe_weak(me.clone()).on::<Reboot>().build()),
        });

        bus.notify::<Reboot>(true).unwrap();
        bus.wait::<Reboot>();
        assert_eq!(owner.hits.load(Ordering::SeqCst), 1);
        assert!(owner.subscription.as_ref().is_some_and(|s| s.covers::<Reboot>()));

        drop(owner);
        assert!(bus.registry::<Reboot>().is_empty());
    }

    #[test]
    fn teardown_inside_own_dispatch_does_not_deadlock() {
        struct Owner {
            subscription: Subscription,
        }

        impl Handler<Reboot> for Owner {
            fn handle(&self, _done: bool) {
                thread::sleep(Duration::from_millis(50));
            }
        }

        impl Drop for Owner {
            fn drop(&mut self) {
                self.subscription.wait_all();
            }
        }

        let bus = EventBus::new();
        let owner = Arc::new_cyclic(|me: &Weak<Owner>| Owner {
            subscription: bus.subscribe_weak(me.clone()).on::<Reboot>().build(),
        });

        bus.notify::<Reboot>(true).unwrap();
        // Give the worker time to upgrade its reference, so the last strong
        // reference is released on the worker thread.
        thread::sleep(Duration::from_millis(20));
        drop(owner);

        assert!(bus.wait_timeout::<Reboot>(Duration::from_secs(10)));
        assert!(bus.registry::<Reboot>().is_empty());
    }

    #[test]
    fn subscription_debug() {
        let bus = EventBus::new();
        let manager = Arc::new(Manager::default());
        let subscription = bus.subscribe(&manager).on::<Boot>().build();

        let debug = format!("{subscription:?}");
        assert!(debug.contains("Subscription"));
        assert!(debug.contains("Manager"));
        assert!(debug.contains("Boot"));
    }
}
