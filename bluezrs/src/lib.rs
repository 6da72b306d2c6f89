//! Typed async bindings for the BlueZ D-Bus API.
//!
//! BlueZ exposes adapters, devices, GATT objects, agents and advertisements
//! as D-Bus objects. This crate gives each interface a typed client handle:
//!
//! - A generic [`Binding`] per (service, object path, interface), with one
//!   typed getter per property, one setter per writable property and one
//!   async method per D-Bus method
//! - A properties record per interface that mirrors the daemon's state and
//!   is kept current by property change watches
//! - Object manager enumeration and `InterfacesAdded`/`InterfacesRemoved`
//!   watches
//! - Exported agent and advertisement objects the daemon calls into
//!
//! # Example
//!
//! ```no_run
//! use bluezrs::{Adapter1, ObjectPath, ZbusBus};
//!
//! # async fn example() -> bluezrs::Result<()> {
//! let bus = ZbusBus::new().await?.shared();
//! let adapter = Adapter1::new(bus, "org.bluez", ObjectPath::adapter("hci0")).await?;
//!
//! if !adapter.properties().read().await.powered {
//!     adapter.set_powered(true).await?;
//! }
//!
//! adapter.start_discovery().await?;
//! let watch = adapter.watch_properties().await?;
//! while let Some(change) = watch.recv().await {
//!     println!("{} -> {:?}", change.name, change.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, BluezError>`. D-Bus errors from
//! property access are classified by name into [`BluezError::NotFound`],
//! [`BluezError::Permission`], [`BluezError::Connection`] and
//! [`BluezError::TypeMismatch`]; anything else is kept verbatim as
//! [`BluezError::Method`]. Errors replied to a method call are always kept
//! verbatim, unless the bus itself failed. Nothing is retried.
//!
//! # Signals
//!
//! Watches are backed by bounded channels fed from D-Bus signals. A binding
//! holds at most one property watch and one object manager watch at a
//! time; asking again returns the live one. [`Binding::close`] cancels both.
//!
//! # Testing
//!
//! [`mock::MockBus`] is an in-memory daemon implementing [`Bus`], so code
//! built on the bindings can be tested without a system bus.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod dbus;
mod monitoring;

// Public API modules
pub mod api;
pub mod mock;
pub mod profile;
pub mod types;
pub mod util;

// Re-exported public API
pub use api::app::App;
pub use api::config::{BusConfig, BusKind};
pub use api::models::{BluezError, ObjectManagerEvent, ObjectPath, PropertyChanged};
pub use crate::core::binding::Binding;
pub use crate::core::bus::{
    Bus, ManagedObjects, PropertiesChangedSignal, SharedBus, SignalSubscription, Target,
};
pub use crate::core::object_manager::ObjectManager;
pub use crate::core::record::PropertiesRecord;
pub use crate::core::schema::{
    ArgSchema, InterfaceSchema, MethodSchema, PropertyAccess, PropertySchema,
};
pub use crate::core::value::{
    FromWire, IntoWire, MethodReply, PropertyMap, RecordField, WireType, WireTyped, WireValue,
};
pub use dbus::bus::ZbusBus;
pub use dbus::convert::property_map_from_dbus;
pub use dbus::export::{AdvertisementObject, Agent, AgentError, AgentObject, SimpleAgent};
pub use dbus::proxies::{BluezObjectManagerProxy, BluezPropertiesProxy};
pub use monitoring::object_manager::{CancelFn, ObjectManagerWatch};
pub use monitoring::properties::PropertyWatch;
pub use profile::*;

/// A specialized `Result` type for BlueZ operations.
pub type Result<T> = std::result::Result<T, BluezError>;
