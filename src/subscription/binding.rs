// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Type-erased link between a listener and one event kind's registry.

use std::any::TypeId;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::event::{EventKind, Handler};
use crate::registry::{ListenerKey, Registry};

/// Operations a subscription performs on each of its event kinds.
pub(crate) trait KindBinding: Send + Sync {
    fn kind_id(&self) -> TypeId;
    fn kind_name(&self) -> &'static str;
    fn register(&self, key: ListenerKey);
    fn unregister(&self, key: ListenerKey) -> bool;
    fn wait(&self);
    fn wait_timeout(&self, timeout: Duration) -> bool;
}

pub(crate) struct Binding<E: EventKind, L> {
    registry: Arc<Registry<E>>,
    listener: Weak<L>,
}

impl<E: EventKind, L> Binding<E, L> {
    pub(crate) fn new(registry: Arc<Registry<E>>, listener: Weak<L>) -> Self {
        Self { registry, listener }
    }
}

impl<E: EventKind, L: Handler<E>> KindBinding for Binding<E, L> {
    fn kind_id(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn kind_name(&self) -> &'static str {
        E::name()
    }

    fn register(&self, key: ListenerKey) {
        let handler: Weak<dyn Handler<E>> = self.listener.clone();
        self.registry.register(key, handler);
    }

    fn unregister(&self, key: ListenerKey) -> bool {
        self.registry.unregister(key)
    }

    fn wait(&self) {
        self.registry.wait();
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        self.registry.wait_timeout(timeout)
    }
}
