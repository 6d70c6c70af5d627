// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scoped listener subscriptions.
//!
//! A [`Subscription`] ties a listener's registration to a scope: building it
//! registers the listener into the registry of every event kind it was
//! declared for, dropping it removes those entries again.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use notifier_lib::{EventBus, EventKind, Handler, Subscription};
//!
//! struct Reboot;
//! impl EventKind for Reboot {
//!     type Args = bool;
//! }
//!
//! struct Boot;
//! impl EventKind for Boot {
//!     type Args = i32;
//! }
//!
//! struct Manager;
//!
//! impl Handler<Reboot> for Manager {
//!     fn handle(&self, done: bool) {
//!         println!("reboot finished: {done}");
//!     }
//! }
//!
//! impl Handler<Boot> for Manager {
//!     fn handle(&self, stage: i32) {
//!         println!("boot stage {stage}");
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let manager = Arc::new(Manager);
//!
//! let subscription = Subscription::builder(&bus, &manager)
//!     .on::<Reboot>()
//!     .on::<Boot>()
//!     .build();
//!
//! bus.notify::<Boot>(42)?;
//!
//! // Join in-flight dispatches before tearing the listener down
//! subscription.wait_all();
//! drop(subscription);
//! # Ok::<(), notifier_lib::Error>(())
//! ```
//!
//! # Identity
//!
//! The listener is registered under a key derived from its concrete type
//! (see [`KeyPolicy`](crate::KeyPolicy)). With the default per-type policy a
//! second live instance of the same type takes over the entry, and dropping
//! either subscription removes it.

mod binding;
mod scoped;

pub use scoped::{Subscription, SubscriptionBuilder};
