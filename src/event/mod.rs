// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event kinds and the handler capability.
//!
//! An [`EventKind`] names one notification contract and fixes its argument
//! type at compile time. A listener receives notifications of a kind by
//! implementing [`Handler`] for it.
//!
//! # Examples
//!
//! ```
//! use notifier_lib::event::{EventKind, Handler};
//!
//! struct Boot;
//!
//! impl EventKind for Boot {
//!     type Args = i32;
//! }
//!
//! struct Manager;
//!
//! impl Handler<Boot> for Manager {
//!     fn handle(&self, stage: i32) {
//!         println!("boot stage {stage}");
//!     }
//! }
//! ```

mod kind;

pub use kind::{EventKind, Handler};
pub(crate) use kind::short_type_name;
