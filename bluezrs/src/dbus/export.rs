//! Local objects the daemon calls into.
//!
//! BlueZ drives pairing through an application-provided `Agent1` object and
//! reads advertisements from an application-provided `LEAdvertisement1`
//! object. Both are served from the connection's object server; see
//! [`ZbusBus::export_agent`](crate::ZbusBus::export_agent) and
//! [`ZbusBus::export_advertisement`](crate::ZbusBus::export_advertisement).

use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use zbus::interface;
use zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::api::models::ObjectPath;
use crate::profile::advertising::LEAdvertisement1Properties;

/// Errors an agent reports back to the daemon.
#[derive(Debug, zbus::DBusError)]
#[zbus(prefix = "org.bluez.Error")]
pub enum AgentError {
    #[zbus(error)]
    ZBus(zbus::Error),
    /// The request was refused.
    Rejected(String),
    /// The request was cancelled.
    Canceled(String),
}

/// Pairing callbacks invoked by the daemon.
///
/// Every request is rejected by default; implement the ones the agent's
/// capability calls for.
#[async_trait]
pub trait Agent: Debug + Send + Sync + 'static {
    /// IO capability passed to `RegisterAgent`.
    fn capability(&self) -> &str {
        "NoInputNoOutput"
    }

    async fn release(&self) {}

    async fn request_pin_code(&self, device: &ObjectPath) -> Result<String, AgentError> {
        Err(AgentError::Rejected(format!("no PIN code for {device}")))
    }

    async fn display_pin_code(&self, _device: &ObjectPath, _pincode: &str) -> Result<(), AgentError> {
        Ok(())
    }

    async fn request_passkey(&self, device: &ObjectPath) -> Result<u32, AgentError> {
        Err(AgentError::Rejected(format!("no passkey for {device}")))
    }

    async fn display_passkey(&self, _device: &ObjectPath, _passkey: u32, _entered: u16) {}

    async fn request_confirmation(&self, device: &ObjectPath, passkey: u32) -> Result<(), AgentError> {
        Err(AgentError::Rejected(format!("passkey {passkey:06} for {device} not confirmed")))
    }

    async fn request_authorization(&self, device: &ObjectPath) -> Result<(), AgentError> {
        Err(AgentError::Rejected(format!("{device} not authorized")))
    }

    async fn authorize_service(&self, device: &ObjectPath, uuid: &str) -> Result<(), AgentError> {
        Err(AgentError::Rejected(format!("service {uuid} not authorized for {device}")))
    }

    async fn cancel(&self) {}
}

/// Accepts every request without user interaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleAgent;

#[async_trait]
impl Agent for SimpleAgent {
    async fn request_confirmation(&self, device: &ObjectPath, passkey: u32) -> Result<(), AgentError> {
        info!("Auto-confirming passkey {passkey:06} for {device}");
        Ok(())
    }

    async fn request_authorization(&self, device: &ObjectPath) -> Result<(), AgentError> {
        info!("Auto-authorizing {device}");
        Ok(())
    }

    async fn authorize_service(&self, device: &ObjectPath, uuid: &str) -> Result<(), AgentError> {
        debug!("Auto-authorizing service {uuid} for {device}");
        Ok(())
    }
}

fn device_path(device: &OwnedObjectPath) -> Result<ObjectPath, AgentError> {
    ObjectPath::new(device.as_str()).map_err(|e| AgentError::Rejected(e.to_string()))
}

/// Serves `org.bluez.Agent1`, forwarding to an [`Agent`].
#[derive(Debug, Clone)]
pub struct AgentObject {
    agent: Arc<dyn Agent>,
}

impl AgentObject {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[interface(name = "org.bluez.Agent1")]
impl AgentObject {
    async fn release(&self) {
        debug!("Agent released by the daemon");
        self.agent.release().await;
    }

    async fn request_pin_code(&self, device: OwnedObjectPath) -> Result<String, AgentError> {
        self.agent.request_pin_code(&device_path(&device)?).await
    }

    async fn display_pin_code(&self, device: OwnedObjectPath, pincode: String) -> Result<(), AgentError> {
        self.agent
            .display_pin_code(&device_path(&device)?, &pincode)
            .await
    }

    async fn request_passkey(&self, device: OwnedObjectPath) -> Result<u32, AgentError> {
        self.agent.request_passkey(&device_path(&device)?).await
    }

    async fn display_passkey(
        &self,
        device: OwnedObjectPath,
        passkey: u32,
        entered: u16,
    ) -> Result<(), AgentError> {
        self.agent
            .display_passkey(&device_path(&device)?, passkey, entered)
            .await;
        Ok(())
    }

    async fn request_confirmation(&self, device: OwnedObjectPath, passkey: u32) -> Result<(), AgentError> {
        self.agent
            .request_confirmation(&device_path(&device)?, passkey)
            .await
    }

    async fn request_authorization(&self, device: OwnedObjectPath) -> Result<(), AgentError> {
        self.agent
            .request_authorization(&device_path(&device)?)
            .await
    }

    async fn authorize_service(&self, device: OwnedObjectPath, uuid: String) -> Result<(), AgentError> {
        self.agent
            .authorize_service(&device_path(&device)?, &uuid)
            .await
    }

    async fn cancel(&self) {
        debug!("Agent request cancelled by the daemon");
        self.agent.cancel().await;
    }
}

/// Appearance value BlueZ treats as "not set".
const NO_APPEARANCE: u16 = u16::MAX;

fn bytes_value(bytes: &[u8]) -> zbus::fdo::Result<OwnedValue> {
    Value::from(bytes.to_vec())
        .try_to_owned()
        .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

/// Serves `org.bluez.LEAdvertisement1` from an advertisement record.
///
/// Unset optional fields are published with the values BlueZ treats as
/// absent: appearance `0xFFFF`, duration and timeout `0`.
#[derive(Debug, Clone)]
pub struct AdvertisementObject {
    props: LEAdvertisement1Properties,
}

impl AdvertisementObject {
    pub fn new(props: LEAdvertisement1Properties) -> Self {
        Self { props }
    }
}

#[interface(name = "org.bluez.LEAdvertisement1")]
impl AdvertisementObject {
    fn release(&self) {
        info!("Advertisement {:?} released by the daemon", self.props.local_name);
    }

    #[zbus(property, name = "Type")]
    fn kind(&self) -> String {
        self.props.kind.clone()
    }

    #[zbus(property, name = "ServiceUUIDs")]
    fn service_uuids(&self) -> Vec<String> {
        self.props.service_uuids.clone()
    }

    #[zbus(property, name = "SolicitUUIDs")]
    fn solicit_uuids(&self) -> Vec<String> {
        self.props.solicit_uuids.clone()
    }

    #[zbus(property)]
    fn manufacturer_data(&self) -> zbus::fdo::Result<HashMap<u16, OwnedValue>> {
        self.props
            .manufacturer_data
            .iter()
            .map(|(id, bytes)| Ok((*id, bytes_value(bytes)?)))
            .collect()
    }

    #[zbus(property)]
    fn service_data(&self) -> zbus::fdo::Result<HashMap<String, OwnedValue>> {
        self.props
            .service_data
            .iter()
            .map(|(uuid, bytes)| Ok((uuid.clone(), bytes_value(bytes)?)))
            .collect()
    }

    #[zbus(property)]
    fn discoverable(&self) -> bool {
        self.props.discoverable
    }

    #[zbus(property)]
    fn includes(&self) -> Vec<String> {
        self.props.includes.clone()
    }

    #[zbus(property)]
    fn local_name(&self) -> String {
        self.props.local_name.clone()
    }

    #[zbus(property)]
    fn appearance(&self) -> u16 {
        self.props.appearance.unwrap_or(NO_APPEARANCE)
    }

    #[zbus(property)]
    fn duration(&self) -> u16 {
        self.props.duration.unwrap_or_default()
    }

    #[zbus(property)]
    fn timeout(&self) -> u16 {
        self.props.timeout.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Strict;

    #[async_trait]
    impl Agent for Strict {}

    #[tokio::test]
    async fn test_default_agent_rejects() {
        let device = ObjectPath::adapter("hci0").device("AA:BB:CC:DD:EE:FF");
        assert!(matches!(
            Strict.request_pin_code(&device).await,
            Err(AgentError::Rejected(_))
        ));
        assert!(Strict.request_confirmation(&device, 123456).await.is_err());
        assert_eq!(Strict.capability(), "NoInputNoOutput");
    }

    #[tokio::test]
    async fn test_simple_agent_accepts() {
        let device = ObjectPath::adapter("hci0").device("AA:BB:CC:DD:EE:FF");
        assert!(SimpleAgent.request_confirmation(&device, 1).await.is_ok());
        assert!(SimpleAgent.request_authorization(&device).await.is_ok());
        assert!(
            SimpleAgent
                .authorize_service(&device, "0000110b-0000-1000-8000-00805f9b34fb")
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_advertisement_defaults_for_unset_fields() {
        let ad = AdvertisementObject::new(LEAdvertisement1Properties {
            kind: "peripheral".into(),
            local_name: "beacon".into(),
            ..Default::default()
        });
        assert_eq!(ad.appearance(), NO_APPEARANCE);
        assert_eq!(ad.timeout(), 0);
        assert_eq!(ad.local_name(), "beacon");
    }
}
