// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `notifier_lib` - a minimal in-process event bus.
//!
//! Components declare which event kinds they handle, register themselves
//! for notification through a scoped [`Subscription`], and a dispatcher
//! invokes every currently registered handler of a kind on a worker thread.
//! An explicit join ([`EventBus::wait`]) waits for the dispatch to finish.
//!
//! The bus is for coordination between decoupled modules of one process,
//! e.g. "tell every subscriber that the reboot finished". It does not
//! persist, queue, or prioritize notifications, and handlers cannot report
//! results back to the notifier.
//!
//! # Concepts
//!
//! - [`EventKind`]: a marker type fixing one notification's argument type
//! - [`Handler`]: the capability a listener implements per event kind
//! - [`Registry`]: per-kind map from [`ListenerKey`] to a weak listener
//!   reference, plus the most recent [`PendingDispatch`]
//! - [`Subscription`]: registers on build, unregisters on drop
//! - [`EventBus`]: the context owning every registry
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use notifier_lib::{EventBus, EventKind, Handler, Subscription};
//!
//! struct Reboot;
//!
//! impl EventKind for Reboot {
//!     type Args = bool;
//! }
//!
//! struct Manager;
//!
//! impl Handler<Reboot> for Manager {
//!     fn handle(&self, done: bool) {
//!         println!("Manager: reboot notification ({done})");
//!     }
//! }
//!
//! fn main() -> notifier_lib::Result<()> {
//!     let bus = EventBus::new();
//!     let manager = Arc::new(Manager);
//!     let subscription = Subscription::builder(&bus, &manager)
//!         .on::<Reboot>()
//!         .build();
//!
//!     // Fire and forget, then join before relying on side effects
//!     bus.notify::<Reboot>(true)?;
//!     bus.wait::<Reboot>();
//!
//!     subscription.wait_all();
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! Each notification runs on its own worker ([`Executor`]). Two
//! notifications of the same kind may run at the same time and interleave
//! freely; the bus does not serialize handlers. Only the most recent
//! dispatch of a kind can be waited for: launching a new one detaches the
//! previous one without cancelling it ([`DispatchReceipt::detached`]).
//!
//! A panic inside a handler is not caught. It ends that dispatch early, is
//! logged at error level and recorded as [`DispatchState::Panicked`]. A
//! task the executor drops without running (a tokio runtime that already
//! shut down) is recorded as [`DispatchState::Abandoned`].
//!
//! # Logging
//!
//! The library logs through [`tracing`] and never installs a subscriber.

pub mod bus;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod registry;
pub mod subscription;

pub use bus::{BusConfig, EventBus, Executor, KeyPolicy};
pub use error::{Error, Result};
pub use event::{EventKind, Handler};
pub use registry::{
    DispatchId, DispatchReceipt, DispatchState, ListenerKey, PendingDispatch, Registry,
};
pub use subscription::{Subscription, SubscriptionBuilder};
