//! Application-wide handles.

use std::sync::Arc;

use crate::Result;
use crate::api::models::ObjectPath;
use crate::core::bus::SharedBus;
use crate::core::object_manager::ObjectManager;
use crate::dbus::export::Agent;
use crate::profile::{Adapter1, LEAdvertisement1Properties};
use crate::types::constants::BLUEZ_SERVICE;

/// The singletons a BlueZ application works with: the adapter binding,
/// the pairing agent, the advertisement it publishes, the bus and the
/// daemon's object manager.
///
/// `App` only holds these; registering the agent, the advertisement or a
/// GATT application is done through the matching manager bindings.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bluezrs::{App, SimpleAgent, ZbusBus};
/// use bluezrs::util::app_path;
///
/// # async fn example() -> bluezrs::Result<()> {
/// let bus = ZbusBus::new().await?.shared();
/// let mut app = App::new(bus, "hci0", app_path("thermometer"), Arc::new(SimpleAgent)).await?;
/// app.set_name("Thermometer");
/// println!("adapter powered: {}", app.adapter().get_powered().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct App {
    adapter_id: String,
    path: ObjectPath,
    adapter: Adapter1,
    agent: Arc<dyn Agent>,
    advertisement: LEAdvertisement1Properties,
    bus: SharedBus,
    object_manager: ObjectManager,
}

impl App {
    /// Binds adapter `adapter_id` (e.g. `hci0`) of `org.bluez`.
    pub async fn new(
        bus: SharedBus,
        adapter_id: &str,
        path: ObjectPath,
        agent: Arc<dyn Agent>,
    ) -> Result<Self> {
        Self::with_service(bus, BLUEZ_SERVICE, adapter_id, path, agent).await
    }

    pub async fn with_service(
        bus: SharedBus,
        service: &str,
        adapter_id: &str,
        path: ObjectPath,
        agent: Arc<dyn Agent>,
    ) -> Result<Self> {
        let adapter = Adapter1::new(Arc::clone(&bus), service, ObjectPath::adapter(adapter_id)).await?;
        Ok(Self {
            adapter_id: adapter_id.to_string(),
            path,
            adapter,
            agent,
            advertisement: LEAdvertisement1Properties::peripheral(""),
            object_manager: ObjectManager::new(Arc::clone(&bus), service),
            bus,
        })
    }

    pub fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    pub fn adapter(&self) -> &Adapter1 {
        &self.adapter
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    /// Root object path of the application's exported objects.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn bus(&self) -> &SharedBus {
        &self.bus
    }

    pub fn object_manager(&self) -> &ObjectManager {
        &self.object_manager
    }

    pub fn advertisement(&self) -> &LEAdvertisement1Properties {
        &self.advertisement
    }

    /// Sets the advertised `LocalName`.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.advertisement.local_name = name.into();
    }
}
