//! The low-level D-Bus client seam.
//!
//! Bindings never talk to a connection directly; they go through a shared
//! [`Bus`] handle. [`ZbusBus`](crate::ZbusBus) implements it over a real
//! system or session bus, [`MockBus`](crate::mock::MockBus) over an
//! in-memory daemon.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::api::models::{ObjectManagerEvent, ObjectPath};
use crate::core::schema::MethodSchema;
use crate::core::value::{PropertyMap, WireValue};

/// Shared bus handle passed to every binding constructor.
pub type SharedBus = Arc<dyn Bus>;

/// Object tree snapshot: path → interface → properties.
pub type ManagedObjects = BTreeMap<ObjectPath, BTreeMap<String, PropertyMap>>;

/// Addresses one interface on one object of one service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub service: String,
    pub path: ObjectPath,
    pub interface: &'static str,
}

impl Target {
    pub fn new(service: impl Into<String>, path: ObjectPath, interface: &'static str) -> Self {
        Self {
            service: service.into(),
            path,
            interface,
        }
    }
}

/// Raw `PropertiesChanged` signal, before schema decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertiesChangedSignal {
    pub path: ObjectPath,
    pub interface: String,
    pub changed: PropertyMap,
    pub invalidated: Vec<String>,
}

/// The low-level client primitives the bindings are built on.
///
/// Every call is one round-trip to the daemon. Implementations classify
/// property and object manager errors with
/// [`crate::BluezError::from_dbus_name`], keep method call errors verbatim
/// with [`crate::BluezError::from_method_error`], and never retry.
#[async_trait]
pub trait Bus: Debug + Send + Sync {
    async fn get_property(&self, target: &Target, name: &str) -> Result<WireValue>;

    async fn set_property(&self, target: &Target, name: &str, value: WireValue) -> Result<()>;

    /// `GetAll` for the target interface.
    async fn get_properties(&self, target: &Target) -> Result<PropertyMap>;

    /// Invokes `method` with already type-checked arguments.
    ///
    /// Returns the single reply value for methods declaring one.
    async fn call(
        &self,
        target: &Target,
        method: &MethodSchema,
        args: Vec<WireValue>,
    ) -> Result<Option<WireValue>>;

    /// Subscribes to `PropertiesChanged` on the target's object.
    async fn subscribe_properties(
        &self,
        target: &Target,
    ) -> Result<SignalSubscription<PropertiesChangedSignal>>;

    /// Subscribes to `InterfacesAdded`/`InterfacesRemoved` of `service`.
    async fn subscribe_object_manager(
        &self,
        service: &str,
    ) -> Result<SignalSubscription<ObjectManagerEvent>>;

    /// `GetManagedObjects` of `service`.
    async fn managed_objects(&self, service: &str) -> Result<ManagedObjects>;
}

/// One live signal subscription.
///
/// Events arrive on a bounded channel. Cancelling (explicitly or by drop)
/// stops delivery at once, including events already queued.
#[derive(Debug)]
pub struct SignalSubscription<T> {
    rx: mpsc::Receiver<T>,
    token: CancellationToken,
}

impl<T> SignalSubscription<T> {
    /// Wraps a receiver and the token that stops its producer.
    pub fn new(rx: mpsc::Receiver<T>, token: CancellationToken) -> Self {
        Self { rx, token }
    }

    /// Creates a channel pair with the given capacity.
    ///
    /// The producer keeps the sender and should stop once the returned
    /// token is cancelled.
    pub fn channel(capacity: usize) -> (mpsc::Sender<T>, CancellationToken, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let token = CancellationToken::new();
        (tx, token.clone(), Self::new(rx, token))
    }

    /// Waits for the next event. `None` once cancelled or once the
    /// producer is gone.
    pub async fn next(&mut self) -> Option<T> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that is cancelled together with this subscription.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl<T> Drop for SignalSubscription<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_delivers_until_cancelled() {
        let (tx, _token, mut sub) = SignalSubscription::<u32>::channel(4);
        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();

        assert_eq!(sub.next().await, Some(1));
        sub.cancel();
        assert!(sub.is_cancelled());
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_subscription_ends_with_producer() {
        let (tx, _token, mut sub) = SignalSubscription::<u32>::channel(1);
        drop(tx);
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_drop_cancels_producer_token() {
        let (_tx, token, sub) = SignalSubscription::<u32>::channel(1);
        assert!(!token.is_cancelled());
        drop(sub);
        assert!(token.is_cancelled());
    }
}
