//! Bluetooth UUID helpers.
//!
//! BlueZ reports and expects 128-bit UUIDs in lower-case hyphenated form.
//! Profiles and advertisements are often written with 16- or 32-bit SIG
//! aliases (`180d`, `0x180F`), which are offsets into the Bluetooth base
//! UUID.

use uuid::Uuid;

use crate::Result;
use crate::api::models::{BluezError, ObjectPath};
use crate::types::constants::{BLUEZ_SERVICE, BLUETOOTH_BASE_UUID};

/// Expands a 16- or 32-bit SIG alias into a full UUID.
pub fn uuid_from_alias(alias: u32) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | (u128::from(alias) << 96))
}

/// Normalizes a UUID string to the 128-bit lower-case form BlueZ uses.
///
/// Accepts 4 or 8 hex digit aliases (optionally `0x`-prefixed) and any
/// form [`Uuid::parse_str`] accepts.
///
/// ```rust
/// use bluezrs::util::normalize_uuid;
///
/// assert_eq!(
///     normalize_uuid("0x180D").unwrap(),
///     "0000180d-0000-1000-8000-00805f9b34fb"
/// );
/// ```
pub fn normalize_uuid(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if matches!(hex.len(), 4 | 8) {
        let alias = u32::from_str_radix(hex, 16).map_err(|_| invalid_uuid(input))?;
        return Ok(uuid_from_alias(alias).hyphenated().to_string());
    }

    Uuid::parse_str(trimmed)
        .map(|u| u.hyphenated().to_string())
        .map_err(|_| invalid_uuid(input))
}

/// Returns the SIG alias of a UUID inside the Bluetooth base range.
pub fn short_alias(uuid: &Uuid) -> Option<u32> {
    let value = uuid.as_u128();
    let mask = (1u128 << 96) - 1;
    (value & mask == BLUETOOTH_BASE_UUID & mask).then(|| (value >> 96) as u32)
}

fn invalid_uuid(input: &str) -> BluezError {
    BluezError::TypeMismatch {
        property: "UUID".into(),
        expected: "a Bluetooth UUID".into(),
        found: input.to_string(),
    }
}

/// A stable object path for an application object named `name`.
///
/// The same name always yields the same path, so a restarted application
/// re-registers at the path it used before.
pub fn app_path(name: &str) -> ObjectPath {
    let id = Uuid::new_v5(&Uuid::NAMESPACE_DNS, format!("{name}.{BLUEZ_SERVICE}").as_bytes());
    ObjectPath::root()
        .child("bluezrs")
        .child(&format!("app_{}", id.simple()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_expansion() {
        assert_eq!(
            uuid_from_alias(0x180f).to_string(),
            "0000180f-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(normalize_uuid("180D").unwrap(), "0000180d-0000-1000-8000-00805f9b34fb");
        assert_eq!(
            normalize_uuid("0000FE95").unwrap(),
            "0000fe95-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_full_uuid_is_lowercased() {
        assert_eq!(
            normalize_uuid("6E400001-B5A3-F393-E0A9-E50E24DCCA9E").unwrap(),
            "6e400001-b5a3-f393-e0a9-e50e24dcca9e"
        );
        assert!(normalize_uuid("not-a-uuid").is_err());
        assert!(normalize_uuid("18zz").is_err());
    }

    #[test]
    fn test_short_alias() {
        assert_eq!(short_alias(&uuid_from_alias(0x2a37)), Some(0x2a37));
        let vendor = Uuid::parse_str("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        assert_eq!(short_alias(&vendor), None);
    }

    #[test]
    fn test_app_path_is_stable() {
        let a = app_path("thermometer");
        assert_eq!(a, app_path("thermometer"));
        assert_ne!(a, app_path("speaker"));
        assert!(a.as_str().starts_with("/bluezrs/app_"));
    }
}
