//! GATT interfaces: manager, profile, service, characteristic, descriptor.

use crate::api::models::ObjectPath;
use crate::core::record::bluez_interface;
use crate::core::value::PropertyMap;
use crate::types::constants::interface;

bluez_interface! {
    /// `GattManager1` has no properties.
    pub struct GattManager1Properties for GattManager1 (interface::GATT_MANAGER) {}
    methods {
        /// Registers a local GATT application rooted at `application`.
        ///
        /// The application object must implement
        /// `org.freedesktop.DBus.ObjectManager`.
        "RegisterApplication" => fn register_application(application: ObjectPath, options: PropertyMap);
        "UnregisterApplication" => fn unregister_application(application: ObjectPath);
    }
}

bluez_interface! {
    /// A GATT profile: the service UUIDs BlueZ should auto-connect for.
    pub struct GattProfile1Properties for GattProfile1 (interface::GATT_PROFILE) {
        /// 128-bit GATT service UUIDs to auto connect.
        "UUIDs" => uuids: Vec<String> [READ_WRITE] get get_uuids, set set_uuids;
    }
    methods {
        /// Called by the daemon when it unregisters the profile.
        "Release" => fn release();
    }
}

bluez_interface! {
    pub struct GattService1Properties for GattService1 (interface::GATT_SERVICE) {
        "UUID" => uuid: String [READ] get get_uuid;
        "Primary" => primary: bool [READ] get get_primary;
        /// Device the service belongs to; absent for local services.
        "Device" => device: Option<ObjectPath> [READ] get get_device;
        /// Included services.
        "Includes" => includes: Vec<ObjectPath> [READ] get get_includes;
        "Handle" => handle: Option<u16> [READ] get get_handle;
    }
    methods {}
}

bluez_interface! {
    pub struct GattCharacteristic1Properties for GattCharacteristic1 (interface::GATT_CHARACTERISTIC) {
        "UUID" => uuid: String [READ] get get_uuid;
        /// Service the characteristic belongs to.
        "Service" => service: ObjectPath [READ] get get_service;
        /// Cached value, updated on reads and notifications.
        "Value" => value: Vec<u8> [READ] get get_value;
        "WriteAcquired" => write_acquired: Option<bool> [READ] get get_write_acquired;
        "NotifyAcquired" => notify_acquired: Option<bool> [READ] get get_notify_acquired;
        "Notifying" => notifying: Option<bool> [READ] get get_notifying;
        /// e.g. `read`, `write-without-response`, `notify`.
        "Flags" => flags: Vec<String> [READ] get get_flags;
        "Handle" => handle: Option<u16> [READ] get get_handle;
        "MTU" => mtu: Option<u16> [READ] get get_mtu;
    }
    methods {
        /// Reads the value. `options` may carry `offset`, `mtu` or `device`.
        "ReadValue" => fn read_value(options: PropertyMap) -> Vec<u8>;
        "WriteValue" => fn write_value(value: Vec<u8>, options: PropertyMap);
        "StartNotify" => fn start_notify();
        "StopNotify" => fn stop_notify();
        /// Confirms an indication.
        "Confirm" => fn confirm();
    }
}

bluez_interface! {
    pub struct GattDescriptor1Properties for GattDescriptor1 (interface::GATT_DESCRIPTOR) {
        "UUID" => uuid: String [READ] get get_uuid;
        "Characteristic" => characteristic: ObjectPath [READ] get get_characteristic;
        "Value" => value: Vec<u8> [READ] get get_value;
        "Flags" => flags: Vec<String> [READ] get get_flags;
        "Handle" => handle: Option<u16> [READ] get get_handle;
    }
    methods {
        "ReadValue" => fn read_value(options: PropertyMap) -> Vec<u8>;
        "WriteValue" => fn write_value(value: Vec<u8>, options: PropertyMap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::PropertiesRecord;
    use crate::core::value::{WireType, WireValue};

    #[test]
    fn test_profile_map_round_trip() {
        let profile = GattProfile1Properties {
            uuids: vec!["0000180d-0000-1000-8000-00805f9b34fb".into()],
        };
        let map = profile.to_map();
        assert_eq!(
            map.get("UUIDs"),
            Some(&WireValue::StrList(profile.uuids.clone()))
        );
        assert_eq!(GattProfile1Properties::from_map(&map).unwrap(), profile);
    }

    #[test]
    fn test_characteristic_value_is_bytes() {
        let schema = GattCharacteristic1Properties::SCHEMA;
        assert_eq!(schema.property("Value").unwrap().wire_type, WireType::Bytes);
        let read = schema.method("ReadValue").unwrap();
        assert_eq!(read.in_signature(), "a{sv}");
        assert_eq!(read.reply, Some(WireType::Bytes));
        assert_eq!(schema.method("WriteValue").unwrap().in_signature(), "aya{sv}");
    }

    #[test]
    fn test_service_includes_are_paths() {
        let mut map = PropertyMap::new();
        map.insert("UUID".into(), WireValue::Str("180f".into()));
        map.insert(
            "Includes".into(),
            WireValue::PathList(vec![ObjectPath::new("/org/bluez/hci0/dev_AA/service0010").unwrap()]),
        );
        let service = GattService1Properties::from_map(&map).unwrap();
        assert_eq!(service.includes.len(), 1);
        assert_eq!(service.device, None);
    }
}
