//! `org.bluez.AgentManager1` and the client side of `org.bluez.Agent1`.
//!
//! The application's own agent is served by
//! [`AgentObject`](crate::AgentObject); the binding here talks to an agent
//! exported by someone else.

use crate::api::models::ObjectPath;
use crate::core::record::bluez_interface;
use crate::types::constants::interface;

bluez_interface! {
    /// `AgentManager1` has no properties.
    pub struct AgentManager1Properties for AgentManager1 (interface::AGENT_MANAGER) {}
    methods {
        /// Registers the agent at `agent` with an IO capability such as
        /// `KeyboardDisplay` or `NoInputNoOutput`.
        "RegisterAgent" => fn register_agent(agent: ObjectPath, capability: String);
        "UnregisterAgent" => fn unregister_agent(agent: ObjectPath);
        /// Makes a registered agent the system default.
        "RequestDefaultAgent" => fn request_default_agent(agent: ObjectPath);
    }
}

bluez_interface! {
    /// `Agent1` has no properties.
    pub struct Agent1Properties for Agent1 (interface::AGENT) {}
    methods {
        "Release" => fn release();
        "RequestPinCode" => fn request_pin_code(device: ObjectPath) -> String;
        "DisplayPinCode" => fn display_pin_code(device: ObjectPath, pincode: String);
        "RequestPasskey" => fn request_passkey(device: ObjectPath) -> u32;
        "DisplayPasskey" => fn display_passkey(device: ObjectPath, passkey: u32, entered: u16);
        "RequestConfirmation" => fn request_confirmation(device: ObjectPath, passkey: u32);
        "RequestAuthorization" => fn request_authorization(device: ObjectPath);
        "AuthorizeService" => fn authorize_service(device: ObjectPath, uuid: String);
        "Cancel" => fn cancel();
    }
}
