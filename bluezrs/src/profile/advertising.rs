//! LE advertising: the manager on the adapter and the advertisement
//! descriptor.

use std::collections::BTreeMap;

use crate::api::models::ObjectPath;
use crate::core::record::bluez_interface;
use crate::core::value::PropertyMap;
use crate::types::constants::interface;

bluez_interface! {
    /// Advertising capabilities of an adapter.
    pub struct LEAdvertisingManager1Properties for LEAdvertisingManager1 (interface::LE_ADVERTISING_MANAGER) {
        /// Advertisement instances currently registered.
        "ActiveInstances" => active_instances: u8 [READ] get get_active_instances;
        "SupportedInstances" => supported_instances: u8 [READ] get get_supported_instances;
        /// e.g. `tx-power`, `appearance`, `local-name`.
        "SupportedIncludes" => supported_includes: Vec<String> [READ] get get_supported_includes;
        "SupportedSecondaryChannels" => supported_secondary_channels: Vec<String> [READ]
            get get_supported_secondary_channels;
        "SupportedCapabilities" => supported_capabilities: PropertyMap [READ]
            get get_supported_capabilities;
        "SupportedFeatures" => supported_features: Vec<String> [READ] get get_supported_features;
    }
    methods {
        /// Registers the advertisement object at `advertisement`.
        "RegisterAdvertisement" => fn register_advertisement(advertisement: ObjectPath, options: PropertyMap);
        "UnregisterAdvertisement" => fn unregister_advertisement(advertisement: ObjectPath);
    }
}

bluez_interface! {
    /// An LE advertisement.
    ///
    /// Applications fill this record and serve it with
    /// [`ZbusBus::export_advertisement`](crate::ZbusBus::export_advertisement).
    pub struct LEAdvertisement1Properties for LEAdvertisement1 (interface::LE_ADVERTISEMENT) {
        /// `broadcast` or `peripheral`.
        "Type" => kind: String [READ] get get_kind;
        "ServiceUUIDs" => service_uuids: Vec<String> [READ] get get_service_uuids;
        "ManufacturerData" => manufacturer_data: BTreeMap<u16, Vec<u8>> [READ]
            get get_manufacturer_data;
        "SolicitUUIDs" => solicit_uuids: Vec<String> [READ] get get_solicit_uuids;
        "ServiceData" => service_data: BTreeMap<String, Vec<u8>> [READ] get get_service_data;
        "Discoverable" => discoverable: bool [READ] get get_discoverable;
        "Includes" => includes: Vec<String> [READ] get get_includes;
        "LocalName" => local_name: String [READ] get get_local_name;
        "Appearance" => appearance: Option<u16> [READ] get get_appearance;
        /// Seconds per rotation when several advertisements are active.
        "Duration" => duration: Option<u16> [READ] get get_duration;
        /// Seconds until the advertisement is removed.
        "Timeout" => timeout: Option<u16> [READ] get get_timeout;
    }
    methods {
        "Release" => fn release();
    }
}

impl LEAdvertisement1Properties {
    /// A discoverable peripheral advertisement named `local_name`.
    pub fn peripheral(local_name: impl Into<String>) -> Self {
        Self {
            kind: "peripheral".into(),
            discoverable: true,
            local_name: local_name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::PropertiesRecord;
    use crate::core::value::WireValue;

    #[test]
    fn test_advertisement_to_map() {
        let mut ad = LEAdvertisement1Properties::peripheral("thermo");
        ad.manufacturer_data.insert(0xffff, vec![0x01]);
        ad.timeout = Some(30);

        let map = ad.to_map();
        assert_eq!(map.get("Type"), Some(&WireValue::Str("peripheral".into())));
        assert_eq!(map.get("Timeout"), Some(&WireValue::UInt16(30)));
        assert!(!map.contains_key("Appearance"));
        assert_eq!(LEAdvertisement1Properties::from_map(&map).unwrap(), ad);
    }
}
