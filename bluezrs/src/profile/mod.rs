//! Typed bindings for the BlueZ interfaces.

pub mod adapter;
pub mod advertising;
pub mod agent;
pub mod gatt;

pub use adapter::{Adapter1, Adapter1Properties, Device1, Device1Properties};
pub use advertising::{
    LEAdvertisement1, LEAdvertisement1Properties, LEAdvertisingManager1,
    LEAdvertisingManager1Properties,
};
pub use agent::{Agent1, Agent1Properties, AgentManager1, AgentManager1Properties};
pub use gatt::{
    GattCharacteristic1, GattCharacteristic1Properties, GattDescriptor1,
    GattDescriptor1Properties, GattManager1, GattManager1Properties, GattProfile1,
    GattProfile1Properties, GattService1, GattService1Properties,
};
