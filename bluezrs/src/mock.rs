//! In-memory daemon for tests.
//!
//! [`MockBus`] implements [`Bus`] over a table of objects. It answers
//! property reads and writes, replays configured method replies and errors,
//! records every method call, and lets tests emit `PropertiesChanged`,
//! `InterfacesAdded` and `InterfacesRemoved` to live subscriptions.
//!
//! ```rust
//! use bluezrs::mock::MockBus;
//! use bluezrs::{GattProfile1, ObjectPath, PropertyMap, WireValue};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> bluezrs::Result<()> {
//! let path = ObjectPath::new("/org/example/profile")?;
//! let mock = MockBus::new();
//! let mut props = PropertyMap::new();
//! props.insert("UUIDs".into(), WireValue::StrList(vec!["180d".into()]));
//! mock.add_object(&path, "org.bluez.GattProfile1", props);
//!
//! let profile = GattProfile1::new(mock.shared(), "org.bluez", path).await?;
//! assert_eq!(profile.to_props().await.uuids, vec!["180d".to_string()]);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::api::models::{BluezError, ObjectManagerEvent, ObjectPath};
use crate::core::bus::{
    Bus, ManagedObjects, PropertiesChangedSignal, SharedBus, SignalSubscription, Target,
};
use crate::core::schema::MethodSchema;
use crate::core::value::{PropertyMap, WireValue};
use crate::types::constants::{BLUEZ_SERVICE, defaults, error_name};

/// One method call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub service: String,
    pub path: ObjectPath,
    pub interface: String,
    pub method: String,
    pub args: Vec<WireValue>,
}

#[derive(Debug, Clone)]
enum MockReply {
    Value(Option<WireValue>),
    Error { name: String, message: String },
}

type ObjectKey = (String, ObjectPath);
type MemberKey = (ObjectPath, String, String);

#[derive(Debug)]
struct Subscriber<T> {
    service: String,
    path: Option<ObjectPath>,
    tx: mpsc::Sender<T>,
    token: CancellationToken,
}

impl<T> Subscriber<T> {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.tx.is_closed()
    }
}

#[derive(Debug)]
struct MockState {
    objects: BTreeMap<ObjectKey, BTreeMap<String, PropertyMap>>,
    replies: HashMap<MemberKey, MockReply>,
    rejected_writes: HashSet<MemberKey>,
    calls: Vec<MockCall>,
    property_subscribers: Vec<Subscriber<PropertiesChangedSignal>>,
    object_manager_subscribers: Vec<Subscriber<ObjectManagerEvent>>,
    unreachable: bool,
    capacity: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            replies: HashMap::new(),
            rejected_writes: HashSet::new(),
            calls: Vec::new(),
            property_subscribers: Vec::new(),
            object_manager_subscribers: Vec::new(),
            unreachable: false,
            capacity: defaults::SIGNAL_CHANNEL_CAPACITY,
        }
    }
}

/// A scriptable in-memory BlueZ daemon.
///
/// Clones share state, so a test can keep one handle while bindings hold
/// another through [`shared`](Self::shared).
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`SharedBus`] handle onto this mock.
    pub fn shared(&self) -> SharedBus {
        Arc::new(self.clone())
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds (or replaces) an interface on an object of `org.bluez`.
    pub fn add_object(&self, path: &ObjectPath, interface: &str, props: PropertyMap) {
        self.add_object_on(BLUEZ_SERVICE, path, interface, props);
    }

    pub fn add_object_on(&self, service: &str, path: &ObjectPath, interface: &str, props: PropertyMap) {
        self.state()
            .objects
            .entry((service.to_string(), path.clone()))
            .or_default()
            .insert(interface.to_string(), props);
    }

    pub fn remove_object(&self, path: &ObjectPath) {
        self.state()
            .objects
            .retain(|(_, p), _| p != path);
    }

    /// Current stored value of a property on any service.
    pub fn property(&self, path: &ObjectPath, interface: &str, name: &str) -> Option<WireValue> {
        self.state()
            .objects
            .iter()
            .filter(|((_, p), _)| p == path)
            .find_map(|(_, ifaces)| ifaces.get(interface)?.get(name).cloned())
    }

    /// Answers `method` with `reply`.
    pub fn set_reply(&self, path: &ObjectPath, interface: &str, method: &str, reply: Option<WireValue>) {
        self.state().replies.insert(
            (path.clone(), interface.to_string(), method.to_string()),
            MockReply::Value(reply),
        );
    }

    /// Answers `method` with the D-Bus error `name`.
    pub fn set_error(&self, path: &ObjectPath, interface: &str, method: &str, name: &str, message: &str) {
        self.state().replies.insert(
            (path.clone(), interface.to_string(), method.to_string()),
            MockReply::Error {
                name: name.to_string(),
                message: message.to_string(),
            },
        );
    }

    /// Makes the daemon refuse writes to a property.
    pub fn reject_writes(&self, path: &ObjectPath, interface: &str, name: &str) {
        self.state()
            .rejected_writes
            .insert((path.clone(), interface.to_string(), name.to_string()));
    }

    /// Simulates a daemon that is not on the bus.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    pub fn set_signal_capacity(&self, capacity: usize) {
        self.state().capacity = capacity.max(1);
    }

    /// Every method call received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Number of live `PropertiesChanged` subscriptions.
    pub fn property_subscriptions(&self) -> usize {
        let mut state = self.state();
        state.property_subscribers.retain(Subscriber::is_live);
        state.property_subscribers.len()
    }

    /// Number of live object manager subscriptions.
    pub fn object_manager_subscriptions(&self) -> usize {
        let mut state = self.state();
        state.object_manager_subscribers.retain(Subscriber::is_live);
        state.object_manager_subscribers.len()
    }

    /// Updates the stored properties of `org.bluez` objects and emits
    /// `PropertiesChanged` to subscribers of `path`.
    pub async fn emit_properties_changed(
        &self,
        path: &ObjectPath,
        interface: &str,
        changed: PropertyMap,
        invalidated: Vec<String>,
    ) {
        self.emit_properties_changed_on(BLUEZ_SERVICE, path, interface, changed, invalidated)
            .await;
    }

    pub async fn emit_properties_changed_on(
        &self,
        service: &str,
        path: &ObjectPath,
        interface: &str,
        changed: PropertyMap,
        invalidated: Vec<String>,
    ) {
        let senders = {
            let mut state = self.state();
            if let Some(props) = state
                .objects
                .get_mut(&(service.to_string(), path.clone()))
                .and_then(|ifaces| ifaces.get_mut(interface))
            {
                for (name, value) in &changed {
                    props.insert(name.clone(), value.clone());
                }
                for name in &invalidated {
                    props.remove(name);
                }
            }
            state.property_subscribers.retain(Subscriber::is_live);
            state
                .property_subscribers
                .iter()
                .filter(|s| s.service == service && s.path.as_ref() == Some(path))
                .map(|s| s.tx.clone())
                .collect::<Vec<_>>()
        };

        let signal = PropertiesChangedSignal {
            path: path.clone(),
            interface: interface.to_string(),
            changed,
            invalidated,
        };
        for tx in senders {
            let _ = tx.send(signal.clone()).await;
        }
    }

    /// Adds interfaces to an `org.bluez` object and emits `InterfacesAdded`.
    pub async fn emit_interfaces_added(
        &self,
        path: &ObjectPath,
        interfaces: BTreeMap<String, PropertyMap>,
    ) {
        {
            let mut state = self.state();
            let entry = state
                .objects
                .entry((BLUEZ_SERVICE.to_string(), path.clone()))
                .or_default();
            for (iface, props) in &interfaces {
                entry.insert(iface.clone(), props.clone());
            }
        }
        self.emit_object_manager(ObjectManagerEvent::InterfacesAdded {
            path: path.clone(),
            interfaces,
        })
        .await;
    }

    /// Removes interfaces from an `org.bluez` object and emits
    /// `InterfacesRemoved`.
    pub async fn emit_interfaces_removed(&self, path: &ObjectPath, interfaces: Vec<String>) {
        {
            let mut state = self.state();
            let key = (BLUEZ_SERVICE.to_string(), path.clone());
            if let Some(entry) = state.objects.get_mut(&key) {
                for iface in &interfaces {
                    entry.remove(iface);
                }
                if entry.is_empty() {
                    state.objects.remove(&key);
                }
            }
        }
        self.emit_object_manager(ObjectManagerEvent::InterfacesRemoved {
            path: path.clone(),
            interfaces,
        })
        .await;
    }

    async fn emit_object_manager(&self, event: ObjectManagerEvent) {
        let senders = {
            let mut state = self.state();
            state.object_manager_subscribers.retain(Subscriber::is_live);
            state
                .object_manager_subscribers
                .iter()
                .filter(|s| s.service == BLUEZ_SERVICE)
                .map(|s| s.tx.clone())
                .collect::<Vec<_>>()
        };
        for tx in senders {
            let _ = tx.send(event.clone()).await;
        }
    }

    fn lookup(&self, target: &Target) -> Result<PropertyMap> {
        self.lookup_with(target, BluezError::from_dbus_name)
    }

    fn lookup_with(&self, target: &Target, error: fn(&str, String) -> BluezError) -> Result<PropertyMap> {
        let state = self.state();
        if state.unreachable {
            return Err(error(
                error_name::SERVICE_UNKNOWN,
                format!("{} is not running", target.service),
            ));
        }
        let ifaces = state
            .objects
            .get(&(target.service.clone(), target.path.clone()))
            .ok_or_else(|| {
                error(
                    error_name::UNKNOWN_OBJECT,
                    format!("no object at {}", target.path),
                )
            })?;
        ifaces.get(target.interface).cloned().ok_or_else(|| {
            error(
                error_name::UNKNOWN_INTERFACE,
                format!("{} has no {}", target.path, target.interface),
            )
        })
    }
}

#[async_trait]
impl Bus for MockBus {
    async fn get_property(&self, target: &Target, name: &str) -> Result<WireValue> {
        self.lookup(target)?.remove(name).ok_or_else(|| {
            BluezError::from_dbus_name(
                error_name::UNKNOWN_PROPERTY,
                format!("{}.{name} is not set", target.interface),
            )
        })
    }

    async fn set_property(&self, target: &Target, name: &str, value: WireValue) -> Result<()> {
        let current = self.lookup(target)?;
        {
            let state = self.state();
            let key = (target.path.clone(), target.interface.to_string(), name.to_string());
            if state.rejected_writes.contains(&key) {
                return Err(BluezError::from_dbus_name(
                    error_name::BLUEZ_NOT_PERMITTED,
                    format!("{name} cannot be written"),
                ));
            }
        }
        if let Some(existing) = current.get(name)
            && existing.wire_type() != value.wire_type()
        {
            return Err(BluezError::from_dbus_name(
                error_name::INVALID_SIGNATURE,
                format!("{name} expects {}", existing.wire_type()),
            ));
        }

        debug!("Mock write {}.{name} on {}", target.interface, target.path);
        let mut changed = PropertyMap::new();
        changed.insert(name.to_string(), value);
        self.emit_properties_changed_on(&target.service, &target.path, target.interface, changed, Vec::new())
            .await;
        Ok(())
    }

    async fn get_properties(&self, target: &Target) -> Result<PropertyMap> {
        self.lookup(target)
    }

    async fn call(
        &self,
        target: &Target,
        method: &MethodSchema,
        args: Vec<WireValue>,
    ) -> Result<Option<WireValue>> {
        self.lookup_with(target, BluezError::from_method_error)?;
        let mut state = self.state();
        state.calls.push(MockCall {
            service: target.service.clone(),
            path: target.path.clone(),
            interface: target.interface.to_string(),
            method: method.name.to_string(),
            args,
        });
        let key = (target.path.clone(), target.interface.to_string(), method.name.to_string());
        match state.replies.get(&key) {
            Some(MockReply::Value(reply)) => Ok(reply.clone()),
            Some(MockReply::Error { name, message }) => {
                Err(BluezError::from_method_error(name, message.clone()))
            }
            None => Ok(None),
        }
    }

    async fn subscribe_properties(
        &self,
        target: &Target,
    ) -> Result<SignalSubscription<PropertiesChangedSignal>> {
        let mut state = self.state();
        if state.unreachable {
            return Err(BluezError::Connection("bus is unreachable".into()));
        }
        let (tx, token, subscription) = SignalSubscription::channel(state.capacity);
        state.property_subscribers.push(Subscriber {
            service: target.service.clone(),
            path: Some(target.path.clone()),
            tx,
            token,
        });
        Ok(subscription)
    }

    async fn subscribe_object_manager(
        &self,
        service: &str,
    ) -> Result<SignalSubscription<ObjectManagerEvent>> {
        let mut state = self.state();
        if state.unreachable {
            return Err(BluezError::Connection("bus is unreachable".into()));
        }
        let (tx, token, subscription) = SignalSubscription::channel(state.capacity);
        state.object_manager_subscribers.push(Subscriber {
            service: service.to_string(),
            path: None,
            tx,
            token,
        });
        Ok(subscription)
    }

    async fn managed_objects(&self, service: &str) -> Result<ManagedObjects> {
        let state = self.state();
        if state.unreachable {
            return Err(BluezError::Connection("bus is unreachable".into()));
        }
        Ok(state
            .objects
            .iter()
            .filter(|((s, _), _)| s == service)
            .map(|((_, path), ifaces)| (path.clone(), ifaces.clone()))
            .collect())
    }
}
