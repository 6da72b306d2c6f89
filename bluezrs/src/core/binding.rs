//! The generic interface binding.
//!
//! One `Binding<R>` exists per (service, object path, interface). The
//! record type `R` carries the interface schema, so the same code serves
//! every BlueZ interface; typed accessors are layered on top by
//! `bluez_interface!`.

use log::debug;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{RwLock, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::api::models::{BluezError, ObjectPath};
use crate::core::bus::{SharedBus, Target};
use crate::core::object_manager::ObjectManager;
use crate::core::record::PropertiesRecord;
use crate::core::value::WireValue;
use crate::monitoring::object_manager::{CancelFn, ObjectManagerWatch};
use crate::monitoring::properties::PropertyWatch;

/// A typed client handle for one D-Bus interface on one object.
///
/// The binding owns a properties record guarded by a read/write lock. The
/// record is filled on construction, refreshed by
/// [`get_properties`](Self::get_properties) and kept current by an active
/// [`PropertyWatch`]. Without a watch it may go stale.
///
/// # Example
///
/// ```no_run
/// use bluezrs::{GattProfile1, ObjectPath, ZbusBus};
///
/// # async fn example() -> bluezrs::Result<()> {
/// let bus = ZbusBus::new().await?.shared();
/// let profile = GattProfile1::new(
///     bus,
///     "org.example.App",
///     ObjectPath::new("/org/example/app/profile0")?,
/// ).await?;
///
/// println!("auto-connect UUIDs: {:?}", profile.properties().read().await.uuids);
///
/// let watch = profile.watch_properties().await?;
/// while let Some(change) = watch.recv().await {
///     println!("{} changed to {:?}", change.name, change.value);
/// }
/// profile.close();
/// # Ok(())
/// # }
/// ```
pub struct Binding<R: PropertiesRecord> {
    bus: SharedBus,
    target: Target,
    properties: Arc<RwLock<R>>,
    property_watch: Mutex<Option<PropertyWatch<R>>>,
    object_manager_watch: Arc<Mutex<Option<ObjectManagerWatch>>>,
    closed: AtomicBool,
    closing: CancellationToken,
}

fn lock_slot<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R: PropertiesRecord> Binding<R> {
    /// Creates a binding for `path` on `service` and fetches all properties.
    ///
    /// # Errors
    ///
    /// Returns [`BluezError::Connection`] if the bus is unreachable or the
    /// object does not implement the interface, and any decode error from
    /// the initial fetch.
    pub async fn new(bus: SharedBus, service: impl Into<String>, path: ObjectPath) -> Result<Self> {
        let binding = Self {
            bus,
            target: Target::new(service, path, R::SCHEMA.name),
            properties: Arc::new(RwLock::new(R::default())),
            property_watch: Mutex::new(None),
            object_manager_watch: Arc::new(Mutex::new(None)),
            closed: AtomicBool::new(false),
            closing: CancellationToken::new(),
        };

        binding.get_properties().await.map_err(|e| match e {
            BluezError::NotFound(msg) => BluezError::Connection(format!(
                "{} is not available at {}: {msg}",
                R::SCHEMA.name,
                binding.target.path
            )),
            other => other,
        })?;

        debug!(
            "Bound {} at {} on {}",
            R::SCHEMA.name, binding.target.path, binding.target.service
        );
        Ok(binding)
    }

    /// Object path of the bound object.
    pub fn path(&self) -> &ObjectPath {
        &self.target.path
    }

    /// Name of the bound interface, e.g. `org.bluez.Adapter1`.
    pub fn interface(&self) -> &'static str {
        self.target.interface
    }

    /// Bus name of the service owning the object.
    pub fn service(&self) -> &str {
        &self.target.service
    }

    /// The shared bus this binding issues its calls on.
    pub fn bus(&self) -> &SharedBus {
        &self.bus
    }

    /// Service, path and interface as one address.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The guarded properties record.
    ///
    /// Hold `read()` or `write()` for the whole duration of an access.
    pub fn properties(&self) -> &RwLock<R> {
        &self.properties
    }

    /// Exclusive access to the properties record.
    pub async fn lock(&self) -> RwLockWriteGuard<'_, R> {
        self.properties.write().await
    }

    /// Snapshot of the properties record.
    pub async fn to_props(&self) -> R {
        self.properties.read().await.clone()
    }

    /// An object manager handle on this binding's service.
    pub fn object_manager(&self) -> ObjectManager {
        ObjectManager::new(Arc::clone(&self.bus), self.target.service.clone())
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves once the binding is closed.
    pub(crate) async fn wait_closed(&self) {
        self.closing.cancelled().await
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(BluezError::Closed)
        } else {
            Ok(())
        }
    }

    /// Reads one property from the daemon.
    ///
    /// # Errors
    ///
    /// [`BluezError::NotFound`] if `name` is not part of the interface or the
    /// daemon does not report it, [`BluezError::TypeMismatch`] if the daemon
    /// answers with a different wire type than the schema declares.
    pub async fn get_property(&self, name: &str) -> Result<WireValue> {
        self.ensure_open()?;
        R::SCHEMA.require_property(name)?;
        let value = self.bus.get_property(&self.target, name).await?;
        R::SCHEMA.check_read(name, &value)?;
        Ok(value)
    }

    /// Writes one property on the daemon.
    ///
    /// The write is validated against the schema first, so an unknown name
    /// never reaches the bus.
    ///
    /// # Errors
    ///
    /// [`BluezError::NotFound`] for unknown names, [`BluezError::Permission`]
    /// for read-only properties or daemon refusal,
    /// [`BluezError::TypeMismatch`] for a value of the wrong wire type.
    pub async fn set_property(&self, name: &str, value: WireValue) -> Result<()> {
        self.ensure_open()?;
        R::SCHEMA.check_write(name, &value)?;
        debug!("Setting {}.{name} on {}", R::SCHEMA.name, self.target.path);
        self.bus.set_property(&self.target, name, value).await
    }

    /// Reloads every property into the record and returns a copy.
    ///
    /// The record's write guard is held for the whole refresh, so no reader
    /// observes a partially updated record.
    pub async fn get_properties(&self) -> Result<R> {
        self.ensure_open()?;
        let mut record = self.properties.write().await;
        let map = self.bus.get_properties(&self.target).await?;
        record.replace_from_map(&map)?;
        Ok(record.clone())
    }

    /// Invokes a D-Bus method declared in the interface schema.
    ///
    /// Daemon errors are returned verbatim as [`BluezError::Method`]. Local
    /// checks fail with [`BluezError::NotFound`] for an undeclared method
    /// and [`BluezError::TypeMismatch`] for bad arguments or replies.
    pub async fn call(&self, method: &str, args: Vec<WireValue>) -> Result<Option<WireValue>> {
        self.ensure_open()?;
        let schema = R::SCHEMA.require_method(method)?;
        schema.check_args(&args)?;

        debug!("Calling {}.{method} on {}", R::SCHEMA.name, self.target.path);
        let reply = self.bus.call(&self.target, schema, args).await?;

        match (schema.reply, &reply) {
            (Some(expected), Some(value)) if value.wire_type() != expected => {
                Err(BluezError::type_mismatch(method, expected, value))
            }
            (Some(expected), None) => Err(BluezError::TypeMismatch {
                property: method.to_string(),
                expected: expected.to_string(),
                found: "empty reply".into(),
            }),
            (None, _) => Ok(None),
            _ => Ok(reply),
        }
    }

    /// The active property watch, if any.
    pub fn property_watch(&self) -> Option<PropertyWatch<R>> {
        lock_slot(&self.property_watch)
            .as_ref()
            .filter(|w| w.is_active())
            .cloned()
    }

    /// Subscribes to property changes of this interface.
    ///
    /// Idempotent: while a watch is active, the same watch is returned
    /// instead of opening a second subscription. Release it with
    /// [`unwatch_properties`](Self::unwatch_properties) or
    /// [`close`](Self::close).
    pub async fn watch_properties(&self) -> Result<PropertyWatch<R>> {
        self.ensure_open()?;
        if let Some(existing) = self.property_watch() {
            return Ok(existing);
        }

        let subscription = self.bus.subscribe_properties(&self.target).await?;
        let watch = PropertyWatch::new(subscription, Arc::clone(&self.properties));

        let mut slot = lock_slot(&self.property_watch);
        if let Some(existing) = slot.as_ref().filter(|w| w.is_active()) {
            // Lost a race with a concurrent caller; keep theirs.
            watch.cancel();
            return Ok(existing.clone());
        }
        if self.is_closed() {
            watch.cancel();
            return Err(BluezError::Closed);
        }
        debug!("Watching {} properties on {}", R::SCHEMA.name, self.target.path);
        *slot = Some(watch.clone());
        Ok(watch)
    }

    /// Releases the active property watch. Receivers on it see `None`.
    pub fn unwatch_properties(&self) {
        if let Some(watch) = lock_slot(&self.property_watch).take() {
            watch.cancel();
        }
    }

    /// Subscribes to object manager events relevant to this binding.
    ///
    /// Events are delivered for objects at or below this binding's path and
    /// for events naming this binding's interface. Idempotent like
    /// [`watch_properties`](Self::watch_properties). The returned closure
    /// cancels the subscription; it has no effect on a newer one.
    pub async fn object_manager_signal(&self) -> Result<(ObjectManagerWatch, CancelFn)> {
        self.ensure_open()?;

        let existing = lock_slot(&self.object_manager_watch)
            .as_ref()
            .filter(|w| w.is_active())
            .cloned();

        let watch = match existing {
            Some(watch) => watch,
            None => {
                let fresh = self
                    .object_manager()
                    .watch_scoped(self.target.path.clone(), Some(self.target.interface))
                    .await?;
                let mut slot = lock_slot(&self.object_manager_watch);
                match slot.as_ref().filter(|w| w.is_active()) {
                    Some(current) => {
                        fresh.cancel();
                        current.clone()
                    }
                    None if self.is_closed() => {
                        fresh.cancel();
                        return Err(BluezError::Closed);
                    }
                    None => {
                        *slot = Some(fresh.clone());
                        fresh
                    }
                }
            }
        };

        let slot = Arc::clone(&self.object_manager_watch);
        let mine = watch.clone();
        let cancel: CancelFn = Box::new(move || {
            let mut slot = lock_slot(&slot);
            if slot.as_ref().is_some_and(|w| w.same_channel(&mine)) {
                slot.take();
            }
            mine.cancel();
        });

        Ok((watch, cancel))
    }

    /// Cancels every subscription and marks the binding closed.
    ///
    /// Calling it again is a no-op. The shared bus connection stays open.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.closing.cancel();
        self.unwatch_properties();
        if let Some(watch) = lock_slot(&self.object_manager_watch).take() {
            watch.cancel();
        }
        debug!("Closed {} binding at {}", R::SCHEMA.name, self.target.path);
    }
}

impl<R: PropertiesRecord> Drop for Binding<R> {
    fn drop(&mut self) {
        let watch = self
            .property_watch
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watch) = watch {
            watch.cancel();
        }
        let om_watch = lock_slot(&self.object_manager_watch).take();
        if let Some(watch) = om_watch {
            watch.cancel();
        }
    }
}

impl<R: PropertiesRecord> fmt::Debug for Binding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("service", &self.target.service)
            .field("path", &self.target.path)
            .field("interface", &self.target.interface)
            .field("closed", &self.is_closed())
            .finish()
    }
}
