//! D-Bus proxies for the freedesktop interfaces BlueZ implements.
//!
//! The BlueZ interfaces themselves are reached through the generic
//! [`Binding`](crate::Binding); only the standard property and object
//! manager interfaces need static proxies.

use std::collections::HashMap;

use zbus::proxy;
use zvariant::{OwnedObjectPath, OwnedValue, Value};

/// `org.freedesktop.DBus.Properties` on any BlueZ object.
///
/// ```ignore
/// let props = BluezPropertiesProxy::builder(&conn)
///     .destination("org.bluez")?
///     .path("/org/bluez/hci0")?
///     .build()
///     .await?;
/// let all = props.get_all("org.bluez.Adapter1").await?;
/// ```
#[proxy(interface = "org.freedesktop.DBus.Properties", default_service = "org.bluez")]
pub trait BluezProperties {
    fn get(&self, interface_name: &str, property_name: &str) -> zbus::Result<OwnedValue>;

    fn set(&self, interface_name: &str, property_name: &str, value: &Value<'_>) -> zbus::Result<()>;

    fn get_all(&self, interface_name: &str) -> zbus::Result<HashMap<String, OwnedValue>>;

    /// Emitted when one or more properties of an interface change.
    #[zbus(signal)]
    fn properties_changed(
        &self,
        interface_name: String,
        changed_properties: HashMap<String, OwnedValue>,
        invalidated_properties: Vec<String>,
    ) -> zbus::Result<()>;
}

/// Interface → property map, as carried by `InterfacesAdded`.
pub type InterfaceMap = HashMap<String, HashMap<String, OwnedValue>>;

/// `org.freedesktop.DBus.ObjectManager` at the daemon's root.
#[proxy(
    interface = "org.freedesktop.DBus.ObjectManager",
    default_service = "org.bluez",
    default_path = "/"
)]
pub trait BluezObjectManager {
    fn get_managed_objects(&self) -> zbus::Result<HashMap<OwnedObjectPath, InterfaceMap>>;

    #[zbus(signal)]
    fn interfaces_added(
        &self,
        object_path: OwnedObjectPath,
        interfaces_and_properties: InterfaceMap,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    fn interfaces_removed(
        &self,
        object_path: OwnedObjectPath,
        interfaces: Vec<String>,
    ) -> zbus::Result<()>;
}
