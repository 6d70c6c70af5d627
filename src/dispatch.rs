// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Free-standing notify and wait on the process-wide bus.
//!
//! These forward to [`EventBus::global`]. Prefer passing an explicit
//! [`EventBus`] around where test isolation matters.
//!
//! ```
//! use notifier_lib::{dispatch, EventKind};
//!
//! struct ShutdownRequested;
//!
//! impl EventKind for ShutdownRequested {
//!     type Args = ();
//! }
//!
//! dispatch::notify::<ShutdownRequested>(())?;
//! dispatch::wait::<ShutdownRequested>();
//! # Ok::<(), notifier_lib::Error>(())
//! ```
//!
//! Arguments are checked against the event kind at compile time:
//!
//! ```compile_fail
//! use notifier_lib::{dispatch, EventKind};
//!
//! struct Boot;
//!
//! impl EventKind for Boot {
//!     type Args = i32;
//! }
//!
//! dispatch::notify::<Boot>("not a number");
//! ```

use std::sync::Arc;

use crate::bus::EventBus;
use crate::error::Result;
use crate::event::EventKind;
use crate::registry::{DispatchReceipt, Registry};
use crate::subscription::SubscriptionBuilder;

/// Notifies every listener registered for `E` on the global bus.
///
/// # Errors
///
/// Returns [`Error::Spawn`](crate::Error::Spawn) if the dispatch worker
/// could not be started.
pub fn notify<E: EventKind>(args: E::Args) -> Result<DispatchReceipt> {
    EventBus::global().notify::<E>(args)
}

/// Blocks until the most recent dispatch of `E` on the global bus finishes.
pub fn wait<E: EventKind>() {
    EventBus::global().wait::<E>();
}

/// Starts a subscription on the global bus.
#[must_use]
pub fn subscribe<L: Send + Sync + 'static>(listener: &Arc<L>) -> SubscriptionBuilder<L> {
    EventBus::global().subscribe(listener)
}

/// Returns the global registry for `E`.
#[must_use]
pub fn registry<E: EventKind>() -> Arc<Registry<E>> {
    EventBus::global().registry::<E>()
}
