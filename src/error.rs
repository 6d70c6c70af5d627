// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the notifier library.
//!
//! The dispatch core has almost no runtime failure modes: argument
//! mismatches are rejected at compile time and handler failures are never
//! reported back to the notifier. What remains is starting the worker that
//! runs a dispatch.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The operating system refused to start a dispatch thread.
    #[error("failed to spawn dispatch worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// A tokio executor was requested outside of a tokio runtime.
    #[cfg(feature = "tokio")]
    #[error("no tokio runtime is running on this thread")]
    NoRuntime,
}

/// A specialized `Result` type for bus operations.
pub type Result<T> = std::result::Result<T, Error>;
