// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener identity.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::bus::KeyPolicy;
use crate::event::short_type_name;

/// Identity under which a listener is stored in a registry.
///
/// Keys are small integers handed out by the bus, tagged with the listener's
/// type name for diagnostics. Under [`KeyPolicy::PerType`] every instance of
/// one concrete type shares a key, so a later registration of the same type
/// replaces the earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    id: u64,
    name: &'static str,
}

impl ListenerKey {
    /// Creates a key from a raw id and a display name.
    #[must_use]
    pub const fn new(id: u64, name: &'static str) -> Self {
        Self { id, name }
    }

    /// Returns the raw id.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.id
    }

    /// Returns the listener type name this key was assigned to.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Hands out listener keys according to a [`KeyPolicy`].
#[derive(Debug)]
pub(crate) struct KeyTable {
    policy: KeyPolicy,
    next_id: AtomicU64,
    by_type: Mutex<HashMap<TypeId, ListenerKey>>,
}

impl KeyTable {
    pub(crate) fn new(policy: KeyPolicy) -> Self {
        Self {
            policy,
            next_id: AtomicU64::new(1),
            by_type: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the key for the next subscription of listener type `L`.
    pub(crate) fn key_for<L: 'static>(&self) -> ListenerKey {
        let name = short_type_name(std::any::type_name::<L>());
        match self.policy {
            KeyPolicy::PerType => *self
                .by_type
                .lock()
                .entry(TypeId::of::<L>())
                .or_insert_with(|| ListenerKey::new(self.fresh_id(), name)),
            KeyPolicy::PerInstance => ListenerKey::new(self.fresh_id(), name),
        }
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}
