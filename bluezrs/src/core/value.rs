//! Wire values: the typed boundary between D-Bus variants and record fields.
//!
//! Every property or method argument crossing the bus is represented as a
//! [`WireValue`]. Record fields convert to and from wire values through
//! [`FromWire`] / [`IntoWire`]; each Rust field type names exactly one
//! [`WireType`], so decoding is driven by the schema and never coerces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display};

use crate::Result;
use crate::api::models::{BluezError, ObjectPath};

/// Untyped property dictionary (`a{sv}` on the wire).
pub type PropertyMap = BTreeMap<String, WireValue>;

/// The D-Bus types BlueZ properties and method arguments use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    Bool,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    Str,
    ObjectPath,
    /// `ay`
    Bytes,
    /// `as`
    StrList,
    /// `ao`
    PathList,
    /// `a{sv}`
    Dict,
    /// `a{qv}`
    U16Dict,
    /// `a{yv}`
    U8Dict,
    /// `a{oa{sv}}`
    PathDict,
}

impl WireType {
    /// D-Bus signature string of this type.
    pub fn signature(self) -> &'static str {
        match self {
            Self::Bool => "b",
            Self::Byte => "y",
            Self::Int16 => "n",
            Self::UInt16 => "q",
            Self::Int32 => "i",
            Self::UInt32 => "u",
            Self::Int64 => "x",
            Self::UInt64 => "t",
            Self::Double => "d",
            Self::Str => "s",
            Self::ObjectPath => "o",
            Self::Bytes => "ay",
            Self::StrList => "as",
            Self::PathList => "ao",
            Self::Dict => "a{sv}",
            Self::U16Dict => "a{qv}",
            Self::U8Dict => "a{yv}",
            Self::PathDict => "a{oa{sv}}",
        }
    }
}

impl Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signature())
    }
}

/// A self-describing value as carried in a D-Bus variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Bool(bool),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Str(String),
    ObjectPath(ObjectPath),
    Bytes(Vec<u8>),
    StrList(Vec<String>),
    PathList(Vec<ObjectPath>),
    Dict(PropertyMap),
    U16Dict(BTreeMap<u16, WireValue>),
    U8Dict(BTreeMap<u8, WireValue>),
    /// Per-object property dictionaries, e.g. `Device1.Sets`.
    PathDict(BTreeMap<ObjectPath, PropertyMap>),
}

impl WireValue {
    pub fn wire_type(&self) -> WireType {
        match self {
            Self::Bool(_) => WireType::Bool,
            Self::Byte(_) => WireType::Byte,
            Self::Int16(_) => WireType::Int16,
            Self::UInt16(_) => WireType::UInt16,
            Self::Int32(_) => WireType::Int32,
            Self::UInt32(_) => WireType::UInt32,
            Self::Int64(_) => WireType::Int64,
            Self::UInt64(_) => WireType::UInt64,
            Self::Double(_) => WireType::Double,
            Self::Str(_) => WireType::Str,
            Self::ObjectPath(_) => WireType::ObjectPath,
            Self::Bytes(_) => WireType::Bytes,
            Self::StrList(_) => WireType::StrList,
            Self::PathList(_) => WireType::PathList,
            Self::Dict(_) => WireType::Dict,
            Self::U16Dict(_) => WireType::U16Dict,
            Self::U8Dict(_) => WireType::U8Dict,
            Self::PathDict(_) => WireType::PathDict,
        }
    }

    /// Decodes into `T`, failing with [`BluezError::TypeMismatch`] if the
    /// wire type differs from `T`'s.
    pub fn decode<T: FromWire>(&self, property: &str) -> Result<T> {
        T::from_wire(self).ok_or_else(|| BluezError::type_mismatch(property, T::WIRE_TYPE, self))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Rust types with a fixed D-Bus wire type.
pub trait WireTyped {
    const WIRE_TYPE: WireType;
}

/// Strict conversion from a wire value. Returns `None` on a type mismatch.
pub trait FromWire: WireTyped + Sized {
    fn from_wire(value: &WireValue) -> Option<Self>;
}

/// Conversion into a wire value.
pub trait IntoWire: WireTyped {
    fn into_wire(self) -> WireValue;
}

macro_rules! wire_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl WireTyped for $ty {
                const WIRE_TYPE: WireType = WireType::$variant;
            }

            impl FromWire for $ty {
                fn from_wire(value: &WireValue) -> Option<Self> {
                    match value {
                        WireValue::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }

            impl IntoWire for $ty {
                fn into_wire(self) -> WireValue {
                    WireValue::$variant(self)
                }
            }
        )*
    };
}

wire_scalar! {
    bool => Bool,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
    String => Str,
    ObjectPath => ObjectPath,
    Vec<u8> => Bytes,
    Vec<String> => StrList,
    Vec<ObjectPath> => PathList,
    PropertyMap => Dict,
}

impl WireTyped for &str {
    const WIRE_TYPE: WireType = WireType::Str;
}

impl IntoWire for &str {
    fn into_wire(self) -> WireValue {
        WireValue::Str(self.to_string())
    }
}

impl WireTyped for &ObjectPath {
    const WIRE_TYPE: WireType = WireType::ObjectPath;
}

impl IntoWire for &ObjectPath {
    fn into_wire(self) -> WireValue {
        WireValue::ObjectPath(self.clone())
    }
}

/// `ServiceData`: service UUID to raw bytes, carried as `a{sv}`.
impl WireTyped for BTreeMap<String, Vec<u8>> {
    const WIRE_TYPE: WireType = WireType::Dict;
}

impl FromWire for BTreeMap<String, Vec<u8>> {
    fn from_wire(value: &WireValue) -> Option<Self> {
        let WireValue::Dict(map) = value else {
            return None;
        };
        map.iter()
            .map(|(k, v)| Vec::<u8>::from_wire(v).map(|bytes| (k.clone(), bytes)))
            .collect()
    }
}

impl IntoWire for BTreeMap<String, Vec<u8>> {
    fn into_wire(self) -> WireValue {
        WireValue::Dict(
            self.into_iter()
                .map(|(k, v)| (k, WireValue::Bytes(v)))
                .collect(),
        )
    }
}

/// `ManufacturerData`: company identifier to raw bytes, carried as `a{qv}`.
impl WireTyped for BTreeMap<u16, Vec<u8>> {
    const WIRE_TYPE: WireType = WireType::U16Dict;
}

impl FromWire for BTreeMap<u16, Vec<u8>> {
    fn from_wire(value: &WireValue) -> Option<Self> {
        let WireValue::U16Dict(map) = value else {
            return None;
        };
        map.iter()
            .map(|(k, v)| Vec::<u8>::from_wire(v).map(|bytes| (*k, bytes)))
            .collect()
    }
}

impl IntoWire for BTreeMap<u16, Vec<u8>> {
    fn into_wire(self) -> WireValue {
        WireValue::U16Dict(
            self.into_iter()
                .map(|(k, v)| (k, WireValue::Bytes(v)))
                .collect(),
        )
    }
}

/// `AdvertisingData`: AD type to raw bytes, carried as `a{yv}`.
impl WireTyped for BTreeMap<u8, Vec<u8>> {
    const WIRE_TYPE: WireType = WireType::U8Dict;
}

impl FromWire for BTreeMap<u8, Vec<u8>> {
    fn from_wire(value: &WireValue) -> Option<Self> {
        let WireValue::U8Dict(map) = value else {
            return None;
        };
        map.iter()
            .map(|(k, v)| Vec::<u8>::from_wire(v).map(|bytes| (*k, bytes)))
            .collect()
    }
}

impl IntoWire for BTreeMap<u8, Vec<u8>> {
    fn into_wire(self) -> WireValue {
        WireValue::U8Dict(
            self.into_iter()
                .map(|(k, v)| (k, WireValue::Bytes(v)))
                .collect(),
        )
    }
}

impl WireTyped for BTreeMap<ObjectPath, PropertyMap> {
    const WIRE_TYPE: WireType = WireType::PathDict;
}

impl FromWire for BTreeMap<ObjectPath, PropertyMap> {
    fn from_wire(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::PathDict(map) => Some(map.clone()),
            _ => None,
        }
    }
}

impl IntoWire for BTreeMap<ObjectPath, PropertyMap> {
    fn into_wire(self) -> WireValue {
        WireValue::PathDict(self)
    }
}

/// A properties-record field.
///
/// Plain fields always encode; `Option` fields model properties the daemon
/// may omit and encode to nothing when `None`.
pub trait RecordField: Sized + Default {
    /// Value type exposed by typed getters and setters.
    type Value: FromWire + IntoWire;

    const WIRE_TYPE: WireType;

    fn decode(value: &WireValue) -> Option<Self>;

    fn encode(&self) -> Option<WireValue>;
}

macro_rules! record_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RecordField for $ty {
                type Value = $ty;

                const WIRE_TYPE: WireType = <$ty as WireTyped>::WIRE_TYPE;

                fn decode(value: &WireValue) -> Option<Self> {
                    <$ty as FromWire>::from_wire(value)
                }

                fn encode(&self) -> Option<WireValue> {
                    Some(self.clone().into_wire())
                }
            }
        )*
    };
}

record_field! {
    bool, u8, i16, u16, i32, u32, i64, u64, f64, String, ObjectPath,
    Vec<u8>, Vec<String>, Vec<ObjectPath>, PropertyMap,
    BTreeMap<String, Vec<u8>>, BTreeMap<u16, Vec<u8>>, BTreeMap<u8, Vec<u8>>,
    BTreeMap<ObjectPath, PropertyMap>,
}

impl<T> RecordField for Option<T>
where
    T: FromWire + IntoWire + Clone,
{
    type Value = T;

    const WIRE_TYPE: WireType = T::WIRE_TYPE;

    fn decode(value: &WireValue) -> Option<Self> {
        T::from_wire(value).map(Some)
    }

    fn encode(&self) -> Option<WireValue> {
        self.clone().map(IntoWire::into_wire)
    }
}

/// Decoding of a method reply according to the declared return type.
pub trait MethodReply: Sized {
    const REPLY: Option<WireType>;

    fn from_reply(method: &str, reply: Option<WireValue>) -> Result<Self>;
}

impl MethodReply for () {
    const REPLY: Option<WireType> = None;

    fn from_reply(_method: &str, _reply: Option<WireValue>) -> Result<Self> {
        Ok(())
    }
}

macro_rules! method_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MethodReply for $ty {
                const REPLY: Option<WireType> = Some(<$ty as WireTyped>::WIRE_TYPE);

                fn from_reply(method: &str, reply: Option<WireValue>) -> Result<Self> {
                    match reply {
                        Some(value) => value.decode(method),
                        None => Err(BluezError::TypeMismatch {
                            property: method.to_string(),
                            expected: <$ty as WireTyped>::WIRE_TYPE.to_string(),
                            found: "empty reply".into(),
                        }),
                    }
                }
            }
        )*
    };
}

method_reply! {
    bool, u8, i16, u16, i32, u32, i64, u64, f64, String, ObjectPath,
    Vec<u8>, Vec<String>, Vec<ObjectPath>, PropertyMap,
}
