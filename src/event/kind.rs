// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event kinds and the handler capability.

/// A distinct notification contract with a fixed argument signature.
///
/// Event kinds are marker types: they carry no data and are never
/// instantiated. They select which registry a notification goes to and which
/// argument type a handler receives. Use a tuple for multi-argument events.
///
/// # Examples
///
/// ```
/// use notifier_lib::EventKind;
///
/// /// Fired when a reboot sequence completes.
/// struct Reboot;
///
/// impl EventKind for Reboot {
///     type Args = bool;
/// }
///
/// /// Fired with the slot index and the firmware label.
/// struct SlotFlashed;
///
/// impl EventKind for SlotFlashed {
///     type Args = (u8, String);
///
///     fn name() -> &'static str {
///         "slot-flashed"
///     }
/// }
///
/// assert_eq!(Reboot::name(), "Reboot");
/// assert_eq!(SlotFlashed::name(), "slot-flashed");
/// ```
pub trait EventKind: 'static {
    /// Arguments delivered to every handler. Each handler receives its own clone.
    type Args: Clone + Send + Sync + 'static;

    /// Human readable name, used in logs and dispatch thread names.
    #[must_use]
    fn name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// The capability a listener implements for one [`EventKind`].
///
/// A listener type implements `Handler<E>` once for every kind it wants to
/// receive. Invoking the capability always reaches the listener; there is no
/// filtering or predicate matching.
///
/// Handlers run on a dispatch worker, never on the notifying thread, and may
/// run concurrently with other dispatches of the same kind. A panic inside
/// `handle` is not caught by the bus: it aborts the rest of that dispatch.
pub trait Handler<E: EventKind>: Send + Sync + 'static {
    /// Handles one notification.
    fn handle(&self, args: E::Args);
}

/// Strips the module path from a type name, keeping generic parameters.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;

    impl EventKind for Ping {
        type Args = ();
    }

    struct Renamed;

    impl EventKind for Renamed {
        type Args = u32;

        fn name() -> &'static str {
            "renamed"
        }
    }

    #[test]
    fn default_name_is_short_type_name() {
        assert_eq!(Ping::name(), "Ping");
    }

    #[test]
    fn name_can_be_overridden() {
        assert_eq!(Renamed::name(), "renamed");
    }

    #[test]
    fn short_name_without_path() {
        assert_eq!(short_type_name("Manager"), "Manager");
    }

    #[test]
    fn short_name_strips_path() {
        assert_eq!(short_type_name("app::nodes::Manager"), "Manager");
    }

    #[test]
    fn short_name_keeps_generic_parameters() {
        assert_eq!(
            short_type_name("app::Wrapper<alloc::string::String>"),
            "Wrapper<alloc::string::String>"
        );
    }
}
