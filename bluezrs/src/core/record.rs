//! Properties records and the interface declaration macro.

use std::collections::HashMap;
use std::fmt::Debug;

use zvariant::OwnedValue;

use crate::Result;
use crate::core::schema::InterfaceSchema;
use crate::core::value::{PropertyMap, WireValue};
use crate::dbus::convert::property_map_from_dbus;

/// A typed mirror of one interface's property set.
///
/// Implementations are generated by `bluez_interface!`; the field set and
/// field types match [`Self::SCHEMA`] exactly. Keys outside the schema are
/// rejected by every decode path with
/// [`BluezError::UnknownProperty`](crate::BluezError::UnknownProperty);
/// keys missing from a map leave their field at its default.
pub trait PropertiesRecord: Debug + Clone + Default + Send + Sync + 'static {
    const SCHEMA: &'static InterfaceSchema;

    /// Current field values as an untyped map. Unset optional properties
    /// are omitted.
    fn to_map(&self) -> PropertyMap;

    /// Updates a single field. `None` resets it to its default, which is
    /// how invalidated properties are applied.
    fn apply(&mut self, name: &str, value: Option<&WireValue>) -> Result<()>;

    /// Decodes a record from an untyped map.
    fn from_map(map: &PropertyMap) -> Result<Self> {
        let mut record = Self::default();
        for (name, value) in map {
            record.apply(name, Some(value))?;
        }
        Ok(record)
    }

    /// Decodes a record from a raw D-Bus properties dictionary.
    fn from_dbus_map(map: &HashMap<String, OwnedValue>) -> Result<Self> {
        Self::from_map(&property_map_from_dbus(map)?)
    }

    /// Replaces every field with the values decoded from `map`.
    ///
    /// Either all fields are replaced or, on error, none are.
    fn replace_from_map(&mut self, map: &PropertyMap) -> Result<()> {
        *self = Self::from_map(map)?;
        Ok(())
    }
}

macro_rules! reply_type {
    () => { () };
    ($ret:ty) => { $ret };
}

pub(crate) use reply_type;

/// Declares one BlueZ interface: its properties record, its schema, a
/// binding type alias and typed accessors on that binding.
///
/// ```ignore
/// bluez_interface! {
///     /// Docs for the record.
///     pub struct GattProfile1Properties for GattProfile1 (interface::GATT_PROFILE) {
///         /// 128-bit GATT service UUIDs to auto connect.
///         "UUIDs" => uuids: Vec<String> [READ_WRITE] get get_uuids, set set_uuids;
///     }
///     methods {
///         "Release" => fn release();
///     }
/// }
/// ```
macro_rules! bluez_interface {
    (
        $(#[$meta:meta])*
        pub struct $record:ident for $binding:ident ($iface:expr) {
            $(
                $(#[$fmeta:meta])*
                $pname:literal => $field:ident : $fty:ty [$access:ident]
                    get $getter:ident $(, set $setter:ident)? ;
            )*
        }
        methods {
            $(
                $(#[$mmeta:meta])*
                $mname:literal => fn $mfn:ident ( $( $arg:ident : $aty:ty ),* ) $( -> $ret:ty )? ;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $record {
            $(
                $(#[$fmeta])*
                pub $field: $fty,
            )*
        }

        impl $crate::core::record::PropertiesRecord for $record {
            const SCHEMA: &'static $crate::core::schema::InterfaceSchema =
                &$crate::core::schema::InterfaceSchema {
                    name: $iface,
                    properties: &[
                        $(
                            $crate::core::schema::PropertySchema {
                                name: $pname,
                                wire_type: <$fty as $crate::core::value::RecordField>::WIRE_TYPE,
                                access: $crate::core::schema::PropertyAccess::$access,
                            },
                        )*
                    ],
                    methods: &[
                        $(
                            $crate::core::schema::MethodSchema {
                                name: $mname,
                                args: &[
                                    $(
                                        $crate::core::schema::ArgSchema {
                                            name: stringify!($arg),
                                            wire_type: <$aty as $crate::core::value::WireTyped>::WIRE_TYPE,
                                        },
                                    )*
                                ],
                                reply: <$crate::core::record::reply_type!($($ret)?)
                                    as $crate::core::value::MethodReply>::REPLY,
                            },
                        )*
                    ],
                };

            #[allow(unused_mut)]
            fn to_map(&self) -> $crate::core::value::PropertyMap {
                let mut map = $crate::core::value::PropertyMap::new();
                $(
                    if let Some(value) = $crate::core::value::RecordField::encode(&self.$field) {
                        map.insert($pname.to_string(), value);
                    }
                )*
                map
            }

            #[allow(unused_variables)]
            fn apply(
                &mut self,
                name: &str,
                value: Option<&$crate::core::value::WireValue>,
            ) -> $crate::Result<()> {
                match name {
                    $(
                        $pname => {
                            self.$field = match value {
                                Some(v) => $crate::core::value::RecordField::decode(v).ok_or_else(|| {
                                    $crate::BluezError::type_mismatch(
                                        $pname,
                                        <$fty as $crate::core::value::RecordField>::WIRE_TYPE,
                                        v,
                                    )
                                })?,
                                None => Default::default(),
                            };
                            Ok(())
                        }
                    )*
                    _ => Err($crate::BluezError::UnknownProperty {
                        interface: $iface.to_string(),
                        property: name.to_string(),
                    }),
                }
            }
        }

        #[doc = concat!("Binding for the `", stringify!($binding), "` interface.")]
        pub type $binding = $crate::Binding<$record>;

        impl $crate::Binding<$record> {
            $(
                $(#[$fmeta])*
                pub async fn $getter(
                    &self,
                ) -> $crate::Result<<$fty as $crate::core::value::RecordField>::Value> {
                    self.get_property($pname).await?.decode($pname)
                }

                $(
                    #[doc = concat!("Writes the `", $pname, "` property.")]
                    pub async fn $setter(
                        &self,
                        value: <$fty as $crate::core::value::RecordField>::Value,
                    ) -> $crate::Result<()> {
                        self.set_property(
                            $pname,
                            $crate::core::value::IntoWire::into_wire(value),
                        )
                        .await
                    }
                )?
            )*

            $(
                $(#[$mmeta])*
                pub async fn $mfn(
                    &self,
                    $( $arg: $aty ),*
                ) -> $crate::Result<$crate::core::record::reply_type!($($ret)?)> {
                    let reply = self
                        .call($mname, vec![$( $crate::core::value::IntoWire::into_wire($arg) ),*])
                        .await?;
                    <$crate::core::record::reply_type!($($ret)?) as $crate::core::value::MethodReply>::from_reply(
                        $mname, reply,
                    )
                }
            )*
        }
    };
}

pub(crate) use bluez_interface;
