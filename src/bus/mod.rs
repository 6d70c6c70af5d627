// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The event bus context and its configuration.
//!
//! An [`EventBus`] owns one [`Registry`](crate::Registry) per event kind and
//! is the explicit context that listeners subscribe to and notifiers fire
//! through. Each test or subsystem can build its own bus; code that prefers
//! zero setup can use [`EventBus::global`] through the free functions in
//! [`dispatch`](crate::dispatch).
//!
//! # Examples
//!
//! ```
//! use notifier_lib::{BusConfig, EventBus, KeyPolicy};
//!
//! // Default: one key per listener type, one OS thread per dispatch
//! let bus = EventBus::new();
//!
//! // Allow several instances of one listener type to coexist
//! let bus = EventBus::with_config(
//!     BusConfig::default().with_key_policy(KeyPolicy::PerInstance),
//! );
//! ```

mod config;
mod event_bus;

pub use config::{BusConfig, DEFAULT_THREAD_NAME_PREFIX, Executor, KeyPolicy};
pub use event_bus::EventBus;
