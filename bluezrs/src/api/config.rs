//! Bus connection settings.

use crate::types::constants::{BLUEZ_SERVICE, defaults};

/// Which message bus to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusKind {
    /// The system bus, where the BlueZ daemon lives.
    #[default]
    System,
    /// The per-user session bus. Useful for test daemons.
    Session,
}

/// Settings for a [`ZbusBus`](crate::ZbusBus).
///
/// # Examples
///
/// ```rust
/// use bluezrs::{BusConfig, BusKind};
///
/// // System bus, `org.bluez`, 32-slot signal channels
/// let config = BusConfig::default();
///
/// // A mock daemon on the session bus
/// let config = BusConfig::new()
///     .with_bus(BusKind::Session)
///     .with_service("org.example.FakeBluez")
///     .with_signal_capacity(8);
/// assert_eq!(config.service, "org.example.FakeBluez");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Bus to connect to
    pub bus: BusKind,
    /// Default destination for bindings and the object manager
    pub service: String,
    /// Buffered events per signal subscription
    pub signal_capacity: usize,
}

impl BusConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bus(mut self, bus: BusKind) -> Self {
        self.bus = bus;
        self
    }

    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Sets the signal channel capacity. Zero is raised to one.
    #[must_use]
    pub fn with_signal_capacity(mut self, capacity: usize) -> Self {
        self.signal_capacity = capacity.max(1);
        self
    }
}

impl Default for BusConfig {
    /// Defaults:
    /// - `bus`: [`BusKind::System`]
    /// - `service`: `org.bluez`
    /// - `signal_capacity`: 32
    fn default() -> Self {
        Self {
            bus: BusKind::System,
            service: BLUEZ_SERVICE.to_string(),
            signal_capacity: defaults::SIGNAL_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BusConfig::default();
        assert_eq!(config.bus, BusKind::System);
        assert_eq!(config.service, "org.bluez");
        assert_eq!(config.signal_capacity, 32);
    }

    #[test]
    fn test_builder_overrides() {
        let config = BusConfig::new()
            .with_bus(BusKind::Session)
            .with_service("org.example.Daemon")
            .with_signal_capacity(0);
        assert_eq!(config.bus, BusKind::Session);
        assert_eq!(config.service, "org.example.Daemon");
        assert_eq!(config.signal_capacity, 1);
    }
}
