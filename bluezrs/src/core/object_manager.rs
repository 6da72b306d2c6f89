//! Object manager handle.
//!
//! Enumerates the daemon's object tree and hands out watches on its
//! `InterfacesAdded` / `InterfacesRemoved` signals.

use log::debug;

use crate::Result;
use crate::api::models::ObjectPath;
use crate::core::bus::{ManagedObjects, SharedBus};
use crate::monitoring::object_manager::ObjectManagerWatch;
use crate::types::constants::interface;

#[derive(Debug, Clone)]
pub struct ObjectManager {
    bus: SharedBus,
    service: String,
}

impl ObjectManager {
    pub fn new(bus: SharedBus, service: impl Into<String>) -> Self {
        Self {
            bus,
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Full object tree: path → interface → properties.
    pub async fn managed_objects(&self) -> Result<ManagedObjects> {
        self.bus.managed_objects(&self.service).await
    }

    /// Paths of all objects implementing `iface`, in path order.
    pub async fn objects_with_interface(&self, iface: &str) -> Result<Vec<ObjectPath>> {
        let objects = self.managed_objects().await?;
        Ok(objects
            .into_iter()
            .filter(|(_, ifaces)| ifaces.contains_key(iface))
            .map(|(path, _)| path)
            .collect())
    }

    /// Paths of all Bluetooth adapters.
    pub async fn adapters(&self) -> Result<Vec<ObjectPath>> {
        self.objects_with_interface(interface::ADAPTER).await
    }

    /// Paths of all remote devices known to `adapter`.
    pub async fn devices(&self, adapter: &ObjectPath) -> Result<Vec<ObjectPath>> {
        let devices = self.objects_with_interface(interface::DEVICE).await?;
        Ok(devices
            .into_iter()
            .filter(|p| p != adapter && p.is_descendant_of(adapter))
            .collect())
    }

    /// Watches every object tree change of the service.
    pub async fn watch(&self) -> Result<ObjectManagerWatch> {
        self.watch_scoped(ObjectPath::root(), None).await
    }

    /// Watches changes below `scope` or naming `iface`.
    pub(crate) async fn watch_scoped(
        &self,
        scope: ObjectPath,
        iface: Option<&'static str>,
    ) -> Result<ObjectManagerWatch> {
        let subscription = self.bus.subscribe_object_manager(&self.service).await?;
        debug!("Subscribed to {} object manager signals (scope {scope})", self.service);
        Ok(ObjectManagerWatch::new(subscription, scope, iface))
    }
}
