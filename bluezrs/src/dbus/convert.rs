//! Conversion between zvariant values and [`WireValue`]s.
//!
//! Decoding is driven by the variant's own signature. Anything BlueZ does
//! not use in a property (structures, nested arrays other than `ay`/`as`/
//! `ao`, dictionaries other than `a{sv}`/`a{qv}`/`a{yv}`/`a{oa{sv}}`) is
//! reported as a type mismatch instead of being coerced.

use std::collections::{BTreeMap, HashMap};

use zbus::message::Body;
use zvariant::{OwnedObjectPath, OwnedValue, StructureBuilder, Value};

use crate::Result;
use crate::api::models::{BluezError, ObjectPath};
use crate::core::value::{PropertyMap, WireType, WireValue};

fn unsupported(name: &str, value: &Value<'_>) -> BluezError {
    BluezError::TypeMismatch {
        property: name.to_string(),
        expected: "a BlueZ property type".into(),
        found: value.value_signature().to_string(),
    }
}

fn object_path(path: &zvariant::ObjectPath<'_>) -> Result<ObjectPath> {
    ObjectPath::new(path.as_str())
}

/// Converts one D-Bus value into a [`WireValue`].
///
/// `name` is only used for error reporting.
pub(crate) fn value_to_wire(name: &str, value: &Value<'_>) -> Result<WireValue> {
    Ok(match value {
        Value::Value(inner) => return value_to_wire(name, inner),
        Value::Bool(v) => WireValue::Bool(*v),
        Value::U8(v) => WireValue::Byte(*v),
        Value::I16(v) => WireValue::Int16(*v),
        Value::U16(v) => WireValue::UInt16(*v),
        Value::I32(v) => WireValue::Int32(*v),
        Value::U32(v) => WireValue::UInt32(*v),
        Value::I64(v) => WireValue::Int64(*v),
        Value::U64(v) => WireValue::UInt64(*v),
        Value::F64(v) => WireValue::Double(*v),
        Value::Str(s) => WireValue::Str(s.to_string()),
        Value::ObjectPath(p) => WireValue::ObjectPath(object_path(p)?),
        Value::Array(arr) => match arr.element_signature().to_string().as_str() {
            "y" => WireValue::Bytes(
                arr.iter()
                    .map(|v| match v {
                        Value::U8(b) => Ok(*b),
                        other => Err(unsupported(name, other)),
                    })
                    .collect::<Result<_>>()?,
            ),
            "s" => WireValue::StrList(
                arr.iter()
                    .map(|v| match v {
                        Value::Str(s) => Ok(s.to_string()),
                        other => Err(unsupported(name, other)),
                    })
                    .collect::<Result<_>>()?,
            ),
            "o" => WireValue::PathList(
                arr.iter()
                    .map(|v| match v {
                        Value::ObjectPath(p) => object_path(p),
                        other => Err(unsupported(name, other)),
                    })
                    .collect::<Result<_>>()?,
            ),
            _ => return Err(unsupported(name, value)),
        },
        Value::Dict(dict) => {
            let mut string_keyed = PropertyMap::new();
            let mut u16_keyed = BTreeMap::new();
            let mut u8_keyed = BTreeMap::new();
            let mut path_keyed = BTreeMap::new();
            for (key, entry) in dict.iter() {
                match key {
                    Value::Str(k) => {
                        string_keyed.insert(k.to_string(), value_to_wire(k.as_str(), entry)?);
                    }
                    Value::U16(k) => {
                        u16_keyed.insert(*k, value_to_wire(name, entry)?);
                    }
                    Value::U8(k) => {
                        u8_keyed.insert(*k, value_to_wire(name, entry)?);
                    }
                    Value::ObjectPath(p) => match value_to_wire(name, entry)? {
                        WireValue::Dict(props) => {
                            path_keyed.insert(object_path(p)?, props);
                        }
                        _ => return Err(unsupported(name, entry)),
                    },
                    other => return Err(unsupported(name, other)),
                }
            }
            match value.value_signature().to_string().as_str() {
                "a{sv}" => WireValue::Dict(string_keyed),
                "a{qv}" => WireValue::U16Dict(u16_keyed),
                "a{yv}" => WireValue::U8Dict(u8_keyed),
                "a{oa{sv}}" => WireValue::PathDict(path_keyed),
                _ => return Err(unsupported(name, value)),
            }
        }
        other => return Err(unsupported(name, other)),
    })
}

/// Converts a raw `a{sv}` dictionary into a [`PropertyMap`].
pub fn property_map_from_dbus(map: &HashMap<String, OwnedValue>) -> Result<PropertyMap> {
    map.iter()
        .map(|(name, value)| Ok((name.clone(), value_to_wire(name, value)?)))
        .collect()
}

/// Converts a [`WireValue`] into an owned D-Bus value.
pub(crate) fn wire_to_value(value: &WireValue) -> Result<Value<'static>> {
    Ok(match value {
        WireValue::Bool(v) => Value::from(*v),
        WireValue::Byte(v) => Value::from(*v),
        WireValue::Int16(v) => Value::from(*v),
        WireValue::UInt16(v) => Value::from(*v),
        WireValue::Int32(v) => Value::from(*v),
        WireValue::UInt32(v) => Value::from(*v),
        WireValue::Int64(v) => Value::from(*v),
        WireValue::UInt64(v) => Value::from(*v),
        WireValue::Double(v) => Value::from(*v),
        WireValue::Str(s) => Value::from(s.clone()),
        WireValue::ObjectPath(p) => Value::from(to_dbus_path(p)?),
        WireValue::Bytes(bytes) => Value::from(bytes.clone()),
        WireValue::StrList(list) => Value::from(list.clone()),
        WireValue::PathList(paths) => Value::from(
            paths
                .iter()
                .map(to_dbus_path)
                .collect::<Result<Vec<_>>>()?,
        ),
        WireValue::Dict(map) => Value::from(owned_properties(map)?),
        WireValue::U16Dict(map) => Value::from(
            map.iter()
                .map(|(k, v)| Ok((*k, wire_to_value(v)?.try_to_owned()?)))
                .collect::<Result<HashMap<u16, OwnedValue>>>()?,
        ),
        WireValue::U8Dict(map) => Value::from(
            map.iter()
                .map(|(k, v)| Ok((*k, wire_to_value(v)?.try_to_owned()?)))
                .collect::<Result<HashMap<u8, OwnedValue>>>()?,
        ),
        WireValue::PathDict(map) => Value::from(
            map.iter()
                .map(|(path, props)| Ok((to_dbus_path(path)?, owned_properties(props)?)))
                .collect::<Result<HashMap<zvariant::ObjectPath<'static>, HashMap<String, OwnedValue>>>>()?,
        ),
    })
}

fn owned_properties(map: &PropertyMap) -> Result<HashMap<String, OwnedValue>> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), wire_to_value(v)?.try_to_owned()?)))
        .collect()
}

fn to_dbus_path(path: &ObjectPath) -> Result<zvariant::ObjectPath<'static>> {
    Ok(zvariant::ObjectPath::try_from(path.as_str().to_owned())?)
}

/// Packs method arguments into a message body.
///
/// Returns `None` for methods without arguments; those are sent with an
/// empty body.
pub(crate) fn method_body(args: &[WireValue]) -> Result<Option<zvariant::Structure<'static>>> {
    if args.is_empty() {
        return Ok(None);
    }
    let mut builder = StructureBuilder::new();
    for arg in args {
        builder = builder.append_field(wire_to_value(arg)?);
    }
    Ok(Some(builder.build()?))
}

/// Decodes a method reply body as the declared reply type.
pub(crate) fn reply_from_body(method: &str, expected: WireType, body: &Body) -> Result<WireValue> {
    Ok(match expected {
        WireType::Bool => WireValue::Bool(body.deserialize()?),
        WireType::Byte => WireValue::Byte(body.deserialize()?),
        WireType::Int16 => WireValue::Int16(body.deserialize()?),
        WireType::UInt16 => WireValue::UInt16(body.deserialize()?),
        WireType::Int32 => WireValue::Int32(body.deserialize()?),
        WireType::UInt32 => WireValue::UInt32(body.deserialize()?),
        WireType::Int64 => WireValue::Int64(body.deserialize()?),
        WireType::UInt64 => WireValue::UInt64(body.deserialize()?),
        WireType::Double => WireValue::Double(body.deserialize()?),
        WireType::Str => WireValue::Str(body.deserialize()?),
        WireType::ObjectPath => {
            let path: OwnedObjectPath = body.deserialize()?;
            WireValue::ObjectPath(object_path(&path)?)
        }
        WireType::Bytes => WireValue::Bytes(body.deserialize()?),
        WireType::StrList => WireValue::StrList(body.deserialize()?),
        WireType::PathList => {
            let paths: Vec<OwnedObjectPath> = body.deserialize()?;
            WireValue::PathList(
                paths
                    .iter()
                    .map(|p| object_path(p))
                    .collect::<Result<_>>()?,
            )
        }
        WireType::Dict => {
            let map: HashMap<String, OwnedValue> = body.deserialize()?;
            WireValue::Dict(property_map_from_dbus(&map)?)
        }
        WireType::U16Dict => {
            let map: HashMap<u16, OwnedValue> = body.deserialize()?;
            WireValue::U16Dict(
                map.iter()
                    .map(|(k, v)| Ok((*k, value_to_wire(method, v)?)))
                    .collect::<Result<_>>()?,
            )
        }
        WireType::U8Dict => {
            let map: HashMap<u8, OwnedValue> = body.deserialize()?;
            WireValue::U8Dict(
                map.iter()
                    .map(|(k, v)| Ok((*k, value_to_wire(method, v)?)))
                    .collect::<Result<_>>()?,
            )
        }
        WireType::PathDict => {
            let map: HashMap<OwnedObjectPath, HashMap<String, OwnedValue>> = body.deserialize()?;
            WireValue::PathDict(
                map.iter()
                    .map(|(path, props)| Ok((object_path(path)?, property_map_from_dbus(props)?)))
                    .collect::<Result<_>>()?,
            )
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: WireValue) -> WireValue {
        let dbus = wire_to_value(&value).unwrap();
        value_to_wire("test", &dbus).unwrap()
    }

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(
            value_to_wire("RSSI", &Value::I16(-70)).unwrap(),
            WireValue::Int16(-70)
        );
        assert_eq!(
            value_to_wire("Powered", &Value::Value(Box::new(Value::Bool(true)))).unwrap(),
            WireValue::Bool(true)
        );
    }

    #[test]
    fn test_array_conversion_follows_element_signature() {
        let uuids = Value::from(vec!["180d".to_string(), "180f".to_string()]);
        assert_eq!(
            value_to_wire("UUIDs", &uuids).unwrap(),
            WireValue::StrList(vec!["180d".into(), "180f".into()])
        );

        let bytes = Value::from(vec![1_u8, 2, 3]);
        assert_eq!(
            value_to_wire("Value", &bytes).unwrap(),
            WireValue::Bytes(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_unsupported_array_is_rejected() {
        let ints = Value::from(vec![1_u32, 2]);
        assert!(matches!(
            value_to_wire("Weird", &ints),
            Err(BluezError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_dictionaries_convert_both_ways() {
        let mut service_data = PropertyMap::new();
        service_data.insert("180d".into(), WireValue::Bytes(vec![0x42]));
        let dict = WireValue::Dict(service_data);
        assert_eq!(round_trip(dict.clone()), dict);

        let mut manufacturer = BTreeMap::new();
        manufacturer.insert(0x004c_u16, WireValue::Bytes(vec![0x02, 0x15]));
        let dict = WireValue::U16Dict(manufacturer);
        assert_eq!(round_trip(dict.clone()), dict);

        let mut advertising = BTreeMap::new();
        advertising.insert(0x01_u8, WireValue::Bytes(vec![0x06]));
        let dict = WireValue::U8Dict(advertising);
        assert_eq!(round_trip(dict.clone()), dict);
    }

    #[test]
    fn test_sets_dictionary_converts() {
        let mut set_props = PropertyMap::new();
        set_props.insert("Rank".into(), WireValue::Byte(1));
        let mut sets = BTreeMap::new();
        sets.insert(ObjectPath::adapter("hci0").child("set_0"), set_props);
        let dict = WireValue::PathDict(sets);
        assert_eq!(round_trip(dict.clone()), dict);
    }

    #[test]
    fn test_paths_convert() {
        let adapter = ObjectPath::adapter("hci0");
        let list = WireValue::PathList(vec![adapter.clone(), adapter.device("AA:BB:CC:DD:EE:FF")]);
        assert_eq!(round_trip(list.clone()), list);
        assert_eq!(
            round_trip(WireValue::ObjectPath(adapter.clone())),
            WireValue::ObjectPath(adapter)
        );
    }

    #[test]
    fn test_property_map_from_dbus() {
        let mut raw = HashMap::new();
        raw.insert("Alias".to_string(), OwnedValue::from(42_u32));
        raw.insert(
            "Name".to_string(),
            Value::from("speaker").try_to_owned().unwrap(),
        );
        let map = property_map_from_dbus(&raw).unwrap();
        assert_eq!(map.get("Alias"), Some(&WireValue::UInt32(42)));
        assert_eq!(map.get("Name"), Some(&WireValue::Str("speaker".into())));
    }

    #[test]
    fn test_method_body_without_args() {
        assert!(method_body(&[]).unwrap().is_none());
        assert!(
            method_body(&[WireValue::Str("KeyboardDisplay".into())])
                .unwrap()
                .is_some()
        );
    }
}
