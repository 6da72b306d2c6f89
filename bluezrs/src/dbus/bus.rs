//! [`Bus`] over a real zbus connection.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use zbus::Connection;
use zbus::proxy::CacheProperties;
use zvariant::OwnedValue;

use crate::Result;
use crate::api::config::{BusConfig, BusKind};
use crate::api::models::{BluezError, ObjectManagerEvent, ObjectPath};
use crate::core::bus::{
    Bus, ManagedObjects, PropertiesChangedSignal, SharedBus, SignalSubscription, Target,
};
use crate::core::schema::MethodSchema;
use crate::core::value::{PropertyMap, WireValue};
use crate::dbus::convert::{method_body, property_map_from_dbus, reply_from_body, value_to_wire, wire_to_value};
use crate::dbus::export::{Agent, AdvertisementObject, AgentObject};
use crate::dbus::proxies::{BluezObjectManagerProxy, BluezPropertiesProxy, InterfaceMap};
use crate::profile::advertising::LEAdvertisement1Properties;
use crate::types::constants::{OBJECT_MANAGER_PATH, error_name};

/// Builds a generic proxy for one interface of one object.
pub(crate) async fn bluez_proxy<'a>(
    conn: &Connection,
    service: &str,
    path: &ObjectPath,
    interface: &'a str,
) -> Result<zbus::Proxy<'a>> {
    Ok(zbus::proxy::Builder::new(conn)
        .destination(service.to_owned())?
        .path(path.as_str().to_owned())?
        .interface(interface)?
        .cache_properties(CacheProperties::No)
        .build()
        .await?)
}

/// A BlueZ client bus backed by a zbus connection.
///
/// Cloning is cheap; clones share the connection. Bindings take the bus as
/// a [`SharedBus`], see [`shared`](Self::shared).
///
/// # Example
///
/// ```no_run
/// use bluezrs::{Adapter1, BusConfig, BusKind, ObjectPath, ZbusBus};
///
/// # async fn example() -> bluezrs::Result<()> {
/// let bus = ZbusBus::with_config(BusConfig::new().with_bus(BusKind::System)).await?;
/// let adapter = Adapter1::new(bus.shared(), "org.bluez", ObjectPath::adapter("hci0")).await?;
/// println!("{}", adapter.get_address().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ZbusBus {
    conn: Connection,
    config: BusConfig,
}

impl ZbusBus {
    /// Connects to the system bus with default settings.
    pub async fn new() -> Result<Self> {
        Self::with_config(BusConfig::default()).await
    }

    pub async fn with_config(config: BusConfig) -> Result<Self> {
        let conn = match config.bus {
            BusKind::System => Connection::system().await,
            BusKind::Session => Connection::session().await,
        }
        .map_err(|e| BluezError::Connection(format!("{:?} bus: {e}", config.bus)))?;
        debug!("Connected to the {:?} bus", config.bus);
        Ok(Self { conn, config })
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: Connection, config: BusConfig) -> Self {
        Self { conn, config }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Default destination service.
    pub fn service(&self) -> &str {
        &self.config.service
    }

    pub fn shared(self) -> SharedBus {
        Arc::new(self)
    }

    async fn properties_proxy(&self, target: &Target) -> Result<BluezPropertiesProxy<'static>> {
        Ok(BluezPropertiesProxy::builder(&self.conn)
            .destination(target.service.clone())?
            .path(target.path.as_str().to_owned())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    async fn object_manager_proxy(&self, service: &str) -> Result<BluezObjectManagerProxy<'static>> {
        Ok(BluezObjectManagerProxy::builder(&self.conn)
            .destination(service.to_owned())?
            .path(OBJECT_MANAGER_PATH)?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    /// Serves `agent` as `org.bluez.Agent1` at `path`.
    ///
    /// Register it afterwards with
    /// [`AgentManager1::register_agent`](crate::AgentManager1).
    ///
    /// # Errors
    ///
    /// Fails with `org.freedesktop.DBus.Error.ObjectPathInUse` if an agent
    /// is already served at `path`; unexport it first.
    pub async fn export_agent(&self, path: &ObjectPath, agent: Arc<dyn Agent>) -> Result<()> {
        let added = self
            .conn
            .object_server()
            .at(path.as_str(), AgentObject::new(agent))
            .await?;
        exported(added, path, "an agent")
    }

    pub async fn unexport_agent(&self, path: &ObjectPath) -> Result<()> {
        self.conn
            .object_server()
            .remove::<AgentObject, _>(path.as_str())
            .await?;
        Ok(())
    }

    /// Serves `props` as `org.bluez.LEAdvertisement1` at `path`.
    ///
    /// Register it afterwards with
    /// [`LEAdvertisingManager1::register_advertisement`](crate::LEAdvertisingManager1).
    /// Fails like [`export_agent`](Self::export_agent) when `path` is taken.
    pub async fn export_advertisement(
        &self,
        path: &ObjectPath,
        props: LEAdvertisement1Properties,
    ) -> Result<()> {
        let added = self
            .conn
            .object_server()
            .at(path.as_str(), AdvertisementObject::new(props))
            .await?;
        exported(added, path, "an advertisement")
    }

    pub async fn unexport_advertisement(&self, path: &ObjectPath) -> Result<()> {
        self.conn
            .object_server()
            .remove::<AdvertisementObject, _>(path.as_str())
            .await?;
        Ok(())
    }
}

/// The object server keeps the existing object when the path is taken.
fn exported(added: bool, path: &ObjectPath, what: &str) -> Result<()> {
    if added {
        debug!("Exported {what} at {path}");
        Ok(())
    } else {
        Err(BluezError::Method {
            name: error_name::OBJECT_PATH_IN_USE.to_string(),
            message: format!("{what} is already exported at {path}"),
        })
    }
}

/// `InvalidArgs` from `Get`/`Set`/`GetAll` means the property or interface does
/// not exist on the object.
fn invalid_args_as_not_found(err: BluezError) -> BluezError {
    match err {
        BluezError::Method { name, message } if name == error_name::INVALID_ARGS => {
            BluezError::NotFound(message)
        }
        other => other,
    }
}

/// Converts a signal payload, dropping entries that do not convert.
fn lenient_property_map(path: &str, map: &HashMap<String, OwnedValue>) -> PropertyMap {
    map.iter()
        .filter_map(|(name, value)| match value_to_wire(name, value) {
            Ok(v) => Some((name.clone(), v)),
            Err(e) => {
                warn!("Skipping {name} on {path}: {e}");
                None
            }
        })
        .collect()
}

fn interfaces_from_dbus(path: &str, map: &InterfaceMap) -> BTreeMap<String, PropertyMap> {
    map.iter()
        .map(|(iface, props)| (iface.clone(), lenient_property_map(path, props)))
        .collect()
}

/// Forwards converted signals into a subscription channel until either
/// side goes away.
fn spawn_forwarder<T: Send + 'static>(
    mut signals: BoxStream<'static, Option<T>>,
    tx: mpsc::Sender<T>,
    token: CancellationToken,
    label: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = signals.next() => {
                    let Some(next) = next else {
                        warn!("Signal stream for {label} ended");
                        break;
                    };
                    let Some(event) = next else { continue };
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        sent = tx.send(event) => if sent.is_err() { break },
                    }
                }
            }
        }
        debug!("Stopped forwarding signals for {label}");
    })
}

#[async_trait]
impl Bus for ZbusBus {
    async fn get_property(&self, target: &Target, name: &str) -> Result<WireValue> {
        let proxy = self.properties_proxy(target).await?;
        let value = proxy
            .get(target.interface, name)
            .await
            .map_err(|e| invalid_args_as_not_found(e.into()))?;
        value_to_wire(name, &value)
    }

    async fn set_property(&self, target: &Target, name: &str, value: WireValue) -> Result<()> {
        let proxy = self.properties_proxy(target).await?;
        let value = wire_to_value(&value)?;
        proxy
            .set(target.interface, name, &value)
            .await
            .map_err(|e| invalid_args_as_not_found(e.into()))
    }

    async fn get_properties(&self, target: &Target) -> Result<PropertyMap> {
        let proxy = self.properties_proxy(target).await?;
        let raw = proxy
            .get_all(target.interface)
            .await
            .map_err(|e| invalid_args_as_not_found(e.into()))?;
        property_map_from_dbus(&raw)
    }

    async fn call(
        &self,
        target: &Target,
        method: &MethodSchema,
        args: Vec<WireValue>,
    ) -> Result<Option<WireValue>> {
        let proxy = bluez_proxy(&self.conn, &target.service, &target.path, target.interface).await?;
        let reply = match method_body(&args)? {
            Some(body) => proxy.call_method(method.name, &body).await,
            None => proxy.call_method(method.name, &()).await,
        }
        .map_err(BluezError::from_method_call)?;
        match method.reply {
            Some(expected) => Ok(Some(reply_from_body(method.name, expected, &reply.body())?)),
            None => Ok(None),
        }
    }

    async fn subscribe_properties(
        &self,
        target: &Target,
    ) -> Result<SignalSubscription<PropertiesChangedSignal>> {
        let proxy = self.properties_proxy(target).await?;
        let changes = proxy.receive_properties_changed().await?;
        let path = target.path.clone();

        let signals = changes
            .map(move |signal| {
                let args = match signal.args() {
                    Ok(args) => args,
                    Err(e) => {
                        warn!("Malformed PropertiesChanged on {path}: {e}");
                        return None;
                    }
                };
                Some(PropertiesChangedSignal {
                    path: path.clone(),
                    interface: args.interface_name().clone(),
                    changed: lenient_property_map(path.as_str(), args.changed_properties()),
                    invalidated: args.invalidated_properties().clone(),
                })
            })
            .boxed();

        let (tx, token, subscription) = SignalSubscription::channel(self.config.signal_capacity);
        let label = format!("{} on {}", target.interface, target.path);
        debug!("Subscribed to PropertiesChanged for {label}");
        spawn_forwarder(signals, tx, token, label);
        Ok(subscription)
    }

    async fn subscribe_object_manager(
        &self,
        service: &str,
    ) -> Result<SignalSubscription<ObjectManagerEvent>> {
        let proxy = self.object_manager_proxy(service).await?;
        let added = proxy.receive_interfaces_added().await?;
        let removed = proxy.receive_interfaces_removed().await?;

        let added = added.map(|signal| {
            let args = signal
                .args()
                .map_err(|e| warn!("Malformed InterfacesAdded: {e}"))
                .ok()?;
            let path = ObjectPath::new(args.object_path().as_str())
                .map_err(|e| warn!("InterfacesAdded with {e}"))
                .ok()?;
            let interfaces = interfaces_from_dbus(path.as_str(), args.interfaces_and_properties());
            Some(ObjectManagerEvent::InterfacesAdded { path, interfaces })
        });
        let removed = removed.map(|signal| {
            let args = signal
                .args()
                .map_err(|e| warn!("Malformed InterfacesRemoved: {e}"))
                .ok()?;
            let path = ObjectPath::new(args.object_path().as_str())
                .map_err(|e| warn!("InterfacesRemoved with {e}"))
                .ok()?;
            Some(ObjectManagerEvent::InterfacesRemoved {
                path,
                interfaces: args.interfaces().clone(),
            })
        });

        let signals = stream::select(added.boxed(), removed.boxed()).boxed();
        let (tx, token, subscription) = SignalSubscription::channel(self.config.signal_capacity);
        debug!("Subscribed to object manager signals of {service}");
        spawn_forwarder(signals, tx, token, format!("{service} object manager"));
        Ok(subscription)
    }

    async fn managed_objects(&self, service: &str) -> Result<ManagedObjects> {
        let proxy = self.object_manager_proxy(service).await?;
        let objects = proxy.get_managed_objects().await?;

        let mut tree = ManagedObjects::new();
        for (path, interfaces) in &objects {
            let path = ObjectPath::new(path.as_str())?;
            let interfaces = interfaces_from_dbus(path.as_str(), interfaces);
            tree.insert(path, interfaces);
        }
        Ok(tree)
    }
}
