use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;

use crate::core::value::{WireType, WireValue};
use crate::types::constants::{BLUEZ_ROOT_PATH, error_name};

/// A validated D-Bus object path.
///
/// Object paths are `/`-separated sequences of elements made of
/// `[A-Za-z0-9_]`. The root path is `/`; no other path may end with a slash
/// and no element may be empty.
///
/// # Example
///
/// ```rust
/// use bluezrs::ObjectPath;
///
/// let adapter = ObjectPath::adapter("hci0");
/// assert_eq!(adapter.as_str(), "/org/bluez/hci0");
///
/// let device = adapter.device("C8:1F:E8:F0:51:57");
/// assert_eq!(device.as_str(), "/org/bluez/hci0/dev_C8_1F_E8_F0_51_57");
/// assert!(device.is_descendant_of(&adapter));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Validates `path` and wraps it.
    pub fn new(path: impl Into<String>) -> Result<Self, BluezError> {
        let path = path.into();
        if is_valid_object_path(&path) {
            Ok(Self(path))
        } else {
            Err(BluezError::InvalidPath(path))
        }
    }

    /// The root path `/`.
    pub fn root() -> Self {
        Self("/".into())
    }

    /// Path of a BlueZ adapter, e.g. `/org/bluez/hci0`.
    ///
    /// Characters outside the object path alphabet are replaced with `_`.
    pub fn adapter(adapter_id: &str) -> Self {
        Self(format!("{BLUEZ_ROOT_PATH}/{}", sanitize_element(adapter_id)))
    }

    /// Path of a remote device below this adapter path.
    ///
    /// BlueZ names device objects `dev_XX_XX_XX_XX_XX_XX` after the
    /// device's Bluetooth address.
    pub fn device(&self, address: &str) -> Self {
        self.child(&format!("dev_{}", address.replace(':', "_")))
    }

    /// Appends one element to this path.
    pub fn child(&self, element: &str) -> Self {
        let element = sanitize_element(element);
        if self.0 == "/" {
            Self(format!("/{element}"))
        } else {
            Self(format!("{}/{element}", self.0))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `self` equals `ancestor` or lies below it.
    pub fn is_descendant_of(&self, ancestor: &ObjectPath) -> bool {
        if ancestor.0 == "/" || self.0 == ancestor.0 {
            return true;
        }
        self.0
            .strip_prefix(ancestor.0.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<ObjectPath> {
        if self.0 == "/" {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }
}

fn sanitize_element(element: &str) -> String {
    let cleaned: String = element
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "_".into() } else { cleaned }
}

fn is_valid_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    rest.split('/').all(|element| {
        !element.is_empty()
            && element
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Defaults to the root path `/`.
impl Default for ObjectPath {
    fn default() -> Self {
        Self::root()
    }
}

impl Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectPath {
    type Err = BluezError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ObjectPath {
    type Error = BluezError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for ObjectPath {
    type Error = BluezError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectPath> for String {
    fn from(path: ObjectPath) -> Self {
        path.0
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A single property change observed on a watched interface.
///
/// A `PropertiesChanged` signal carrying several properties is delivered as
/// one event per property. Invalidated properties carry no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChanged {
    /// Interface the property belongs to.
    pub interface: String,
    /// Object the signal was emitted from.
    pub path: ObjectPath,
    /// Property name as published by BlueZ (e.g. `"UUIDs"`).
    pub name: String,
    /// New value, or `None` if the daemon invalidated the property.
    pub value: Option<WireValue>,
}

impl PropertyChanged {
    /// Returns `true` if the daemon invalidated the property instead of
    /// sending a new value.
    pub fn is_invalidated(&self) -> bool {
        self.value.is_none()
    }
}

/// Object tree change reported by the daemon's object manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectManagerEvent {
    /// Interfaces (with their initial properties) appeared on an object.
    InterfacesAdded {
        path: ObjectPath,
        interfaces: std::collections::BTreeMap<String, crate::PropertyMap>,
    },
    /// Interfaces were removed from an object.
    InterfacesRemoved {
        path: ObjectPath,
        interfaces: Vec<String>,
    },
}

impl ObjectManagerEvent {
    /// Object the event refers to.
    pub fn path(&self) -> &ObjectPath {
        match self {
            Self::InterfacesAdded { path, .. } | Self::InterfacesRemoved { path, .. } => path,
        }
    }

    /// Returns `true` if the event names `interface`.
    pub fn involves_interface(&self, interface: &str) -> bool {
        match self {
            Self::InterfacesAdded { interfaces, .. } => interfaces.contains_key(interface),
            Self::InterfacesRemoved { interfaces, .. } => interfaces.iter().any(|i| i == interface),
        }
    }
}

/// Errors returned by every binding operation.
///
/// Binding calls are I/O against the BlueZ daemon and should be treated as
/// fallible. The variants follow what went wrong rather than where, so the
/// same kind is reported whether a check failed locally or the daemon
/// rejected the request.
///
/// # Example
///
/// ```no_run
/// use bluezrs::{BluezError, GattProfile1, ObjectPath, ZbusBus};
///
/// # async fn example() -> bluezrs::Result<()> {
/// let bus = ZbusBus::new().await?.shared();
/// let path = ObjectPath::new("/org/example/profile")?;
/// let profile = GattProfile1::new(bus, "org.example.App", path).await?;
///
/// match profile.set_uuids(vec!["0000180d-0000-1000-8000-00805f9b34fb".into()]).await {
///     Ok(()) => println!("updated"),
///     Err(BluezError::Permission(msg)) => eprintln!("not allowed: {msg}"),
///     Err(BluezError::Method { name, message }) => eprintln!("{name}: {message}"),
///     Err(e) => eprintln!("error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Error)]
pub enum BluezError {
    /// The bus is unreachable, or the object/interface does not exist.
    #[error("connection error: {0}")]
    Connection(String),

    /// An object, interface, property or method is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write was rejected (read-only property or daemon policy).
    #[error("permission denied: {0}")]
    Permission(String),

    /// A value did not match the schema's wire type.
    #[error("type mismatch for `{property}`: expected {expected}, found {found}")]
    TypeMismatch {
        property: String,
        expected: String,
        found: String,
    },

    /// A property map contained a key the interface schema does not define.
    #[error("`{property}` is not a property of {interface}")]
    UnknownProperty { interface: String, property: String },

    /// The daemon answered a method call with an error.
    #[error("{name}: {message}")]
    Method { name: String, message: String },

    /// The binding was closed.
    #[error("binding is closed")]
    Closed,

    /// A wait gave up before the expected change arrived.
    #[error("timed out waiting for property change")]
    Timeout,

    /// A string was not a valid D-Bus object path.
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// Any other transport-level D-Bus error.
    #[error("D-Bus error: {0}")]
    Dbus(zbus::Error),
}

impl BluezError {
    pub(crate) fn type_mismatch(property: &str, expected: WireType, found: &WireValue) -> Self {
        Self::TypeMismatch {
            property: property.to_string(),
            expected: expected.to_string(),
            found: found.wire_type().to_string(),
        }
    }

    /// Classifies a D-Bus error by name.
    ///
    /// Unknown names are kept verbatim as [`BluezError::Method`].
    pub fn from_dbus_name(name: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match name {
            error_name::UNKNOWN_PROPERTY
            | error_name::UNKNOWN_OBJECT
            | error_name::UNKNOWN_INTERFACE
            | error_name::UNKNOWN_METHOD
            | error_name::BLUEZ_DOES_NOT_EXIST => Self::NotFound(message),
            name if is_bus_failure(name) => Self::Connection(message),
            error_name::PROPERTY_READ_ONLY
            | error_name::ACCESS_DENIED
            | error_name::BLUEZ_NOT_PERMITTED
            | error_name::BLUEZ_NOT_AUTHORIZED => Self::Permission(message),
            error_name::INVALID_SIGNATURE => Self::TypeMismatch {
                property: String::new(),
                expected: "daemon signature".into(),
                found: message,
            },
            _ => Self::Method {
                name: name.to_string(),
                message,
            },
        }
    }

    /// Wraps the error reply of a method call.
    ///
    /// The daemon's name and message are kept verbatim as
    /// [`BluezError::Method`]. Only failures of the bus itself (no owner,
    /// no reply, disconnect) become [`BluezError::Connection`].
    pub fn from_method_error(name: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_bus_failure(name) {
            Self::Connection(message)
        } else {
            Self::Method {
                name: name.to_string(),
                message,
            }
        }
    }

    /// Converts a zbus error raised by a method call, see
    /// [`from_method_error`](Self::from_method_error).
    pub(crate) fn from_method_call(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, detail, _) => {
                Self::from_method_error(name.as_str(), detail.unwrap_or_default())
            }
            other => Self::from(other),
        }
    }

    /// Returns `true` for [`BluezError::NotFound`] and
    /// [`BluezError::UnknownProperty`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::UnknownProperty { .. })
    }
}

fn is_bus_failure(name: &str) -> bool {
    matches!(
        name,
        error_name::SERVICE_UNKNOWN
            | error_name::NAME_HAS_NO_OWNER
            | error_name::NO_REPLY
            | error_name::DISCONNECTED
    )
}

impl From<zbus::Error> for BluezError {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, detail, _) => {
                Self::from_dbus_name(name.as_str(), detail.unwrap_or_default())
            }
            zbus::Error::InputOutput(e) => Self::Connection(e.to_string()),
            zbus::Error::Address(e) => Self::Connection(e),
            zbus::Error::Handshake(e) => Self::Connection(e),
            other => Self::Dbus(other),
        }
    }
}

impl From<zbus::fdo::Error> for BluezError {
    fn from(err: zbus::fdo::Error) -> Self {
        Self::from(zbus::Error::from(err))
    }
}

impl From<zvariant::Error> for BluezError {
    fn from(err: zvariant::Error) -> Self {
        Self::Dbus(zbus::Error::Variant(err))
    }
}
