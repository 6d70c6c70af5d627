// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener registries and dispatch handles.
//!
//! There is one [`Registry`] per event kind. It maps a [`ListenerKey`] to a
//! non-owning reference to the listener and keeps at most one
//! [`PendingDispatch`]: the most recently launched one. Launching a new
//! dispatch detaches the previous one without cancelling it.
//!
//! Registries are normally obtained from an [`EventBus`](crate::EventBus),
//! but can be used on their own:
//!
//! ```
//! use std::sync::{Arc, Weak};
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! use notifier_lib::{EventKind, Handler, ListenerKey, Registry};
//!
//! struct Boot;
//!
//! impl EventKind for Boot {
//!     type Args = i32;
//! }
//!
//! #[derive(Default)]
//! struct Adder(AtomicU32);
//!
//! impl Handler<Boot> for Adder {
//!     fn handle(&self, stage: i32) {
//!         self.0.store(stage as u32, Ordering::SeqCst);
//!     }
//! }
//!
//! let registry = Registry::<Boot>::new();
//! let adder = Arc::new(Adder::default());
//! let entry: Weak<Adder> = Arc::downgrade(&adder);
//! registry.register(ListenerKey::new(1, "Adder"), entry);
//!
//! registry.dispatch(42)?;
//! registry.wait();
//! assert_eq!(adder.0.load(Ordering::SeqCst), 42);
//! # Ok::<(), notifier_lib::Error>(())
//! ```
//!
//! # Hazards
//!
//! - Under per-type keys, a second instance of a listener type silently
//!   replaces the first, and dropping either subscription removes the shared
//!   entry.
//! - A handler panic is not caught: it ends that dispatch early and is
//!   recorded as [`DispatchState::Panicked`].
//! - Dispatches detached by a newer one cannot be waited for.

mod kind_registry;
mod listener_key;
mod pending;

pub use kind_registry::Registry;
pub use listener_key::ListenerKey;
pub(crate) use listener_key::KeyTable;
pub use pending::{DispatchId, DispatchReceipt, DispatchState, PendingDispatch};
