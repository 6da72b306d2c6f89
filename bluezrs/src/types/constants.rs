//! Constants for the BlueZ D-Bus API.
//!
//! Service, interface and error names published by the BlueZ daemon and the
//! freedesktop standard interfaces it implements.

/// Well-known bus name of the BlueZ daemon.
pub const BLUEZ_SERVICE: &str = "org.bluez";

/// Root object path of the BlueZ object tree.
pub const BLUEZ_ROOT_PATH: &str = "/org/bluez";

/// Path the daemon exports its `ObjectManager` at.
pub const OBJECT_MANAGER_PATH: &str = "/";

/// BlueZ interface names.
pub mod interface {
    pub const ADAPTER: &str = "org.bluez.Adapter1";
    pub const DEVICE: &str = "org.bluez.Device1";
    pub const AGENT: &str = "org.bluez.Agent1";
    pub const AGENT_MANAGER: &str = "org.bluez.AgentManager1";
    pub const GATT_MANAGER: &str = "org.bluez.GattManager1";
    pub const GATT_PROFILE: &str = "org.bluez.GattProfile1";
    pub const GATT_SERVICE: &str = "org.bluez.GattService1";
    pub const GATT_CHARACTERISTIC: &str = "org.bluez.GattCharacteristic1";
    pub const GATT_DESCRIPTOR: &str = "org.bluez.GattDescriptor1";
    pub const LE_ADVERTISING_MANAGER: &str = "org.bluez.LEAdvertisingManager1";
    pub const LE_ADVERTISEMENT: &str = "org.bluez.LEAdvertisement1";

    pub const PROPERTIES: &str = "org.freedesktop.DBus.Properties";
    pub const OBJECT_MANAGER: &str = "org.freedesktop.DBus.ObjectManager";
}

/// D-Bus error names the binding classifies.
///
/// Anything not listed here is surfaced as a method error carrying the
/// daemon's name and message verbatim.
pub mod error_name {
    pub const UNKNOWN_PROPERTY: &str = "org.freedesktop.DBus.Error.UnknownProperty";
    pub const UNKNOWN_OBJECT: &str = "org.freedesktop.DBus.Error.UnknownObject";
    pub const UNKNOWN_INTERFACE: &str = "org.freedesktop.DBus.Error.UnknownInterface";
    pub const UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
    pub const SERVICE_UNKNOWN: &str = "org.freedesktop.DBus.Error.ServiceUnknown";
    pub const NAME_HAS_NO_OWNER: &str = "org.freedesktop.DBus.Error.NameHasNoOwner";
    pub const NO_REPLY: &str = "org.freedesktop.DBus.Error.NoReply";
    pub const DISCONNECTED: &str = "org.freedesktop.DBus.Error.Disconnected";
    pub const PROPERTY_READ_ONLY: &str = "org.freedesktop.DBus.Error.PropertyReadOnly";
    pub const ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";
    pub const INVALID_SIGNATURE: &str = "org.freedesktop.DBus.Error.InvalidSignature";
    pub const INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";
    pub const OBJECT_PATH_IN_USE: &str = "org.freedesktop.DBus.Error.ObjectPathInUse";
    pub const BLUEZ_NOT_PERMITTED: &str = "org.bluez.Error.NotPermitted";
    pub const BLUEZ_NOT_AUTHORIZED: &str = "org.bluez.Error.NotAuthorized";
    pub const BLUEZ_DOES_NOT_EXIST: &str = "org.bluez.Error.DoesNotExist";
    pub const BLUEZ_REJECTED: &str = "org.bluez.Error.Rejected";
    pub const BLUEZ_CANCELED: &str = "org.bluez.Error.Canceled";
}

/// Defaults applied by [`BusConfig`](crate::BusConfig).
pub mod defaults {
    /// Capacity of each signal delivery channel.
    ///
    /// Once full, the transport-side forwarder waits for the consumer.
    pub const SIGNAL_CHANNEL_CAPACITY: usize = 32;
}

/// Base UUID of the Bluetooth SIG 16/32-bit UUID space.
pub const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;
