// SPDX-License-Identifier: MPL-2.0

//! Two components wired to the bus.
//!
//! `Manager` and `Coordinator` both handle `Reboot` and `Boot`. The
//! coordinator only lives for the reboot notification, so the boot
//! notification reaches the manager alone.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example notifier
//!
//! # With bus internals
//! RUST_LOG=notifier_lib=debug cargo run --example notifier
//! ```

use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use notifier_lib::{EventBus, EventKind, Handler, Subscription};
use tracing_subscriber::EnvFilter;

/// A reboot sequence finished.
struct Reboot;

impl EventKind for Reboot {
    type Args = bool;
}

/// A boot stage was reached.
struct Boot;

impl EventKind for Boot {
    type Args = i32;
}

struct Manager {
    subscription: Subscription,
}

impl Manager {
    fn new(bus: &EventBus) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Self>| Self {
            subscription: bus
                .subscribe_weak(me.clone())
                .on::<Reboot>()
                .on::<Boot>()
                .build(),
        })
    }
}

impl Handler<Reboot> for Manager {
    fn handle(&self, done: bool) {
        thread::sleep(Duration::from_millis(100));
        tracing::info!(component = "Manager", done, "Reboot notification");
    }
}

impl Handler<Boot> for Manager {
    fn handle(&self, stage: i32) {
        thread::sleep(Duration::from_millis(102));
        tracing::info!(component = "Manager", stage, "Boot notification");
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.subscription.wait_all();
    }
}

struct Coordinator {
    subscription: Subscription,
}

impl Coordinator {
    fn new(bus: &EventBus) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Self>| Self {
            subscription: bus
                .subscribe_weak(me.clone())
                .on::<Reboot>()
                .on::<Boot>()
                .build(),
        })
    }
}

impl Handler<Reboot> for Coordinator {
    fn handle(&self, done: bool) {
        thread::sleep(Duration::from_millis(100));
        tracing::info!(component = "Coordinator", done, "Reboot notification");
    }
}

impl Handler<Boot> for Coordinator {
    fn handle(&self, stage: i32) {
        thread::sleep(Duration::from_millis(102));
        tracing::info!(component = "Coordinator", stage, "Boot notification");
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.subscription.wait_all();
    }
}

fn main() -> notifier_lib::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let bus = EventBus::new();
    let manager = Manager::new(&bus);

    {
        let coordinator = Coordinator::new(&bus);
        bus.notify::<Reboot>(true)?;
        // Join before releasing the last handle: a listener dropped ahead of
        // its turn is skipped by the dispatch.
        coordinator.subscription.wait_all();
    }

    bus.notify::<Boot>(42)?;

    tracing::info!("Main thread stopping");
    manager.subscription.wait_all();
    Ok(())
}
