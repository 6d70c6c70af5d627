// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bus configuration types.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default prefix for dispatch thread names.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "notify";

/// How listener keys are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// One key per concrete listener type.
    ///
    /// A second live instance of the same type replaces the first in every
    /// registry it subscribes to, and dropping either instance's subscription
    /// removes whichever entry currently sits under the shared key.
    #[default]
    PerType,
    /// One key per subscription. Instances of the same type coexist.
    PerInstance,
}

/// Where dispatch tasks run.
#[derive(Debug, Clone, Default)]
pub enum Executor {
    /// A dedicated, named OS thread per dispatch.
    #[default]
    Thread,
    /// The blocking pool of a tokio runtime.
    #[cfg(feature = "tokio")]
    Tokio(tokio::runtime::Handle),
    /// Behaves like `Thread` until the flag is set, then refuses to spawn.
    #[cfg(test)]
    Refusing(std::sync::Arc<std::sync::atomic::AtomicBool>),
}

impl Executor {
    /// Captures the tokio runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`](crate::Error::NoRuntime) when called
    /// outside of a tokio runtime.
    #[cfg(feature = "tokio")]
    pub fn current() -> Result<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::Tokio)
            .map_err(|_| crate::Error::NoRuntime)
    }

    /// Launches `task` without waiting for it.
    ///
    /// NUL bytes are removed from `name`; the OS thread API rejects them.
    pub(crate) fn spawn<F>(&self, name: String, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = sanitize_thread_name(name);
        match self {
            Self::Thread => {
                std::thread::Builder::new().name(name).spawn(task)?;
            }
            #[cfg(feature = "tokio")]
            Self::Tokio(handle) => {
                tracing::trace!(task = %name, "Spawning dispatch on tokio blocking pool");
                drop(handle.spawn_blocking(task));
            }
            #[cfg(test)]
            Self::Refusing(refuse) => {
                if refuse.load(std::sync::atomic::Ordering::SeqCst) {
                    return Err(std::io::Error::other("executor refused task").into());
                }
                std::thread::Builder::new().name(name).spawn(task)?;
            }
        }
        Ok(())
    }
}

fn sanitize_thread_name(name: String) -> String {
    if name.contains('\0') {
        tracing::warn!(name = %name.escape_debug(), "Dropping NUL bytes from dispatch thread name");
        name.replace('\0', "")
    } else {
        name
    }
}

/// Configuration for an [`EventBus`](crate::EventBus).
///
/// # Examples
///
/// ```
/// use notifier_lib::{BusConfig, EventBus, KeyPolicy};
///
/// let config = BusConfig::default()
///     .with_key_policy(KeyPolicy::PerInstance)
///     .with_thread_name_prefix("app-events");
///
/// let bus = EventBus::with_config(config);
/// assert_eq!(bus.config().key_policy, KeyPolicy::PerInstance);
/// ```
///
/// The serializable part can be loaded from application settings; the
/// executor is not serialized and falls back to [`Executor::Thread`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// How listener keys are derived.
    pub key_policy: KeyPolicy,
    /// Prefix of dispatch thread names, followed by the event kind name.
    pub thread_name_prefix: String,
    /// Where dispatch tasks run.
    #[serde(skip)]
    pub executor: Executor,
}

impl BusConfig {
    /// Sets the key policy.
    #[must_use]
    pub fn with_key_policy(mut self, policy: KeyPolicy) -> Self {
        self.key_policy = policy;
        self
    }

    /// Sets the dispatch thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Sets the executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    pub(crate) fn thread_name(&self, kind: &str) -> String {
        format!("{}-{kind}", self.thread_name_prefix)
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            key_policy: KeyPolicy::default(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            executor: Executor::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn default_config() {
        let config = BusConfig::default();
        assert_eq!(config.key_policy, KeyPolicy::PerType);
        assert_eq!(config.thread_name_prefix, "notify");
        assert!(matches!(config.executor, Executor::Thread));
    }

    #[test]
    fn builder_methods() {
        let config = BusConfig::default()
            .with_key_policy(KeyPolicy::PerInstance)
            .with_thread_name_prefix("events")
            .with_executor(Executor::Thread);

        assert_eq!(config.key_policy, KeyPolicy::PerInstance);
        assert_eq!(config.thread_name("Boot"), "events-Boot");
    }

    #[test]
    fn deserialize_partial_config() {
        let config: BusConfig = serde_json::from_str(r#"{"key_policy":"per_instance"}"#).unwrap();

        assert_eq!(config.key_policy, KeyPolicy::PerInstance);
        assert_eq!(config.thread_name_prefix, DEFAULT_THREAD_NAME_PREFIX);
        assert!(matches!(config.executor, Executor::Thread));
    }

    #[test]
    fn serialize_skips_executor() {
        let json = serde_json::to_string(&BusConfig::default()).unwrap();
        assert_eq!(json, r#"{"key_policy":"per_type","thread_name_prefix":"notify"}"#);
    }

    #[test]
    fn thread_executor_names_thread() {
        let (tx, rx) = mpsc::channel();
        Executor::Thread
            .spawn("notify-Boot".to_string(), move || {
                let name = std::thread::current().name().map(str::to_owned);
                tx.send(name).unwrap();
            })
            .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("notify-Boot"));
    }

    #[test]
    fn thread_name_with_nul_still_spawns() {
        let config: BusConfig =
            serde_json::from_str(r#"{"thread_name_prefix":"app\u0000events"}"#).unwrap();
        let (tx, rx) = mpsc::channel();

        Executor::Thread
            .spawn(config.thread_name("Boot"), move || {
                let name = std::thread::current().name().map(str::to_owned);
                tx.send(name).unwrap();
            })
            .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("appevents-Boot"));
    }

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_thread_name("notify-Boot".to_string()), "notify-Boot");
        assert_eq!(sanitize_thread_name("a\0b\0".to_string()), "ab");
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn current_fails_outside_runtime() {
        assert!(matches!(
            Executor::current(),
            Err(crate::Error::NoRuntime)
        ));
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn current_captures_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _enter = runtime.enter();

        assert!(matches!(Executor::current(), Ok(Executor::Tokio(_))));
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn tokio_executor_runs_task() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (tx, rx) = mpsc::channel();

        Executor::Tokio(runtime.handle().clone())
            .spawn("notify-Boot".to_string(), move || tx.send(42).unwrap())
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }
}
