//! `org.bluez.Adapter1` and `org.bluez.Device1`.

use crate::api::models::ObjectPath;
use crate::core::record::bluez_interface;
use crate::core::value::PropertyMap;
use crate::types::constants::interface;

bluez_interface! {
    /// Properties of a local Bluetooth controller.
    pub struct Adapter1Properties for Adapter1 (interface::ADAPTER) {
        /// Bluetooth device address, e.g. `00:1A:7D:DA:71:13`.
        "Address" => address: String [READ] get get_address;
        /// `public` or `random`.
        "AddressType" => address_type: String [READ] get get_address_type;
        /// System name (pretty hostname).
        "Name" => name: String [READ] get get_name;
        /// Friendly name; falls back to `Name` when cleared.
        "Alias" => alias: String [READ_WRITE] get get_alias, set set_alias;
        /// Class of device.
        "Class" => class: u32 [READ] get get_class;
        "Powered" => powered: bool [READ_WRITE] get get_powered, set set_powered;
        /// Adapter power transition state, e.g. `off-enabling`.
        "PowerState" => power_state: Option<String> [READ] get get_power_state;
        "Discoverable" => discoverable: bool [READ_WRITE] get get_discoverable, set set_discoverable;
        /// Seconds until discoverable mode ends; `0` disables the timer.
        "DiscoverableTimeout" => discoverable_timeout: u32 [READ_WRITE]
            get get_discoverable_timeout, set set_discoverable_timeout;
        "Pairable" => pairable: bool [READ_WRITE] get get_pairable, set set_pairable;
        "PairableTimeout" => pairable_timeout: u32 [READ_WRITE]
            get get_pairable_timeout, set set_pairable_timeout;
        "Connectable" => connectable: Option<bool> [READ_WRITE] get get_connectable, set set_connectable;
        "Discovering" => discovering: bool [READ] get get_discovering;
        /// 128-bit UUIDs of the locally available services.
        "UUIDs" => uuids: Vec<String> [READ] get get_uuids;
        "Modalias" => modalias: Option<String> [READ] get get_modalias;
        /// Supported roles: `central`, `peripheral`, `central-peripheral`.
        "Roles" => roles: Vec<String> [READ] get get_roles;
        "ExperimentalFeatures" => experimental_features: Vec<String> [READ]
            get get_experimental_features;
        /// Company identifier of the controller manufacturer.
        "Manufacturer" => manufacturer: Option<u16> [READ] get get_manufacturer;
        /// Bluetooth core version of the controller.
        "Version" => version: Option<u8> [READ] get get_version;
    }
    methods {
        "StartDiscovery" => fn start_discovery();
        "StopDiscovery" => fn stop_discovery();
        /// Removes the remote device object and its pairing information.
        "RemoveDevice" => fn remove_device(device: ObjectPath);
        /// Sets the discovery filter for this client, e.g. `Transport` = `le`.
        "SetDiscoveryFilter" => fn set_discovery_filter(filter: PropertyMap);
        /// Filter keys supported by `SetDiscoveryFilter`.
        "GetDiscoveryFilters" => fn get_discovery_filters() -> Vec<String>;
    }
}

bluez_interface! {
    /// Properties of a remote Bluetooth device.
    ///
    /// Many of these are only present while the device is in range or
    /// after a connection; those are `Option` fields.
    pub struct Device1Properties for Device1 (interface::DEVICE) {
        "Address" => address: String [READ] get get_address;
        "AddressType" => address_type: String [READ] get get_address_type;
        "Name" => name: Option<String> [READ] get get_name;
        /// Freedesktop icon name, e.g. `audio-headset`.
        "Icon" => icon: Option<String> [READ] get get_icon;
        "Class" => class: Option<u32> [READ] get get_class;
        /// GAP appearance value.
        "Appearance" => appearance: Option<u16> [READ] get get_appearance;
        "UUIDs" => uuids: Vec<String> [READ] get get_uuids;
        "Paired" => paired: bool [READ] get get_paired;
        "Bonded" => bonded: bool [READ] get get_bonded;
        "Connected" => connected: bool [READ] get get_connected;
        "Trusted" => trusted: bool [READ_WRITE] get get_trusted, set set_trusted;
        /// Incoming connections are rejected while blocked.
        "Blocked" => blocked: bool [READ_WRITE] get get_blocked, set set_blocked;
        "WakeAllowed" => wake_allowed: bool [READ_WRITE] get get_wake_allowed, set set_wake_allowed;
        "Alias" => alias: String [READ_WRITE] get get_alias, set set_alias;
        /// Adapter the device belongs to.
        "Adapter" => adapter: ObjectPath [READ] get get_adapter;
        "LegacyPairing" => legacy_pairing: bool [READ] get get_legacy_pairing;
        "Modalias" => modalias: Option<String> [READ] get get_modalias;
        /// Inquiry or advertising RSSI, only while discovering.
        "RSSI" => rssi: Option<i16> [READ] get get_rssi;
        /// Advertised transmit power level.
        "TxPower" => tx_power: Option<i16> [READ] get get_tx_power;
        /// Company identifier to manufacturer specific data.
        "ManufacturerData" => manufacturer_data: std::collections::BTreeMap<u16, Vec<u8>> [READ]
            get get_manufacturer_data;
        /// Service UUID to service data.
        "ServiceData" => service_data: std::collections::BTreeMap<String, Vec<u8>> [READ]
            get get_service_data;
        /// Set once GATT service discovery has completed.
        "ServicesResolved" => services_resolved: bool [READ] get get_services_resolved;
        "AdvertisingFlags" => advertising_flags: Vec<u8> [READ] get get_advertising_flags;
        /// AD type to raw advertising data, for types not decoded elsewhere.
        "AdvertisingData" => advertising_data: Option<std::collections::BTreeMap<u8, Vec<u8>>> [READ]
            get get_advertising_data;
        /// Coordinated sets the device is a member of, keyed by set object.
        "Sets" => sets: Option<std::collections::BTreeMap<ObjectPath, PropertyMap>> [READ] get get_sets;
        /// `last-used`, `le`, `bredr` or `last-seen` for dual-mode devices.
        "PreferredBearer" => preferred_bearer: Option<String> [READ_WRITE]
            get get_preferred_bearer, set set_preferred_bearer;
        /// Set for devices paired over the caBLE (hybrid) transport.
        "CablePairing" => cable_pairing: Option<bool> [READ] get get_cable_pairing;
    }
    methods {
        /// Connects all auto-connectable profiles.
        "Connect" => fn connect();
        "Disconnect" => fn disconnect();
        "ConnectProfile" => fn connect_profile(uuid: String);
        "DisconnectProfile" => fn disconnect_profile(uuid: String);
        /// Starts pairing. The registered agent handles the exchange.
        "Pair" => fn pair();
        "CancelPairing" => fn cancel_pairing();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::PropertiesRecord;
    use crate::core::value::WireValue;

    #[test]
    fn test_adapter_schema() {
        let schema = Adapter1Properties::SCHEMA;
        assert_eq!(schema.name, "org.bluez.Adapter1");
        assert!(schema.property("Powered").unwrap().is_writable());
        assert!(!schema.property("Address").unwrap().is_writable());
        assert_eq!(schema.method("RemoveDevice").unwrap().in_signature(), "o");
        assert_eq!(
            schema.method("SetDiscoveryFilter").unwrap().in_signature(),
            "a{sv}"
        );
    }

    #[test]
    fn test_device_optional_fields_stay_unset() {
        let mut map = PropertyMap::new();
        map.insert("Address".into(), WireValue::Str("C8:1F:E8:F0:51:57".into()));
        map.insert("Connected".into(), WireValue::Bool(true));

        let device = Device1Properties::from_map(&map).unwrap();
        assert_eq!(device.address, "C8:1F:E8:F0:51:57");
        assert!(device.connected);
        assert_eq!(device.rssi, None);
        assert!(!device.to_map().contains_key("RSSI"));
    }

    #[test]
    fn test_device_rssi_type_is_checked() {
        let mut map = PropertyMap::new();
        map.insert("RSSI".into(), WireValue::Int32(-60));
        assert!(matches!(
            Device1Properties::from_map(&map),
            Err(crate::BluezError::TypeMismatch { .. })
        ));
    }
}
