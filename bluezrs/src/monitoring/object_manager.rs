//! Object manager watches.

use log::debug;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::api::models::{ObjectManagerEvent, ObjectPath};
use crate::core::bus::SignalSubscription;

/// Deregisters an object manager watch handed out by a binding.
pub type CancelFn = Box<dyn FnOnce() + Send + Sync>;

/// A live stream of `InterfacesAdded` / `InterfacesRemoved` events.
///
/// A watch created by a binding only yields events for objects in the
/// binding's subtree or events naming the binding's interface. A watch
/// created by [`ObjectManager::watch`](crate::ObjectManager::watch) yields
/// everything.
#[derive(Clone)]
pub struct ObjectManagerWatch {
    inner: Arc<OmWatchInner>,
}

struct OmWatchInner {
    subscription: Mutex<SignalSubscription<ObjectManagerEvent>>,
    token: CancellationToken,
    scope: ObjectPath,
    interface: Option<&'static str>,
}

impl ObjectManagerWatch {
    pub(crate) fn new(
        subscription: SignalSubscription<ObjectManagerEvent>,
        scope: ObjectPath,
        interface: Option<&'static str>,
    ) -> Self {
        let token = subscription.token();
        Self {
            inner: Arc::new(OmWatchInner {
                subscription: Mutex::new(subscription),
                token,
                scope,
                interface,
            }),
        }
    }

    /// Waits for the next relevant event; `None` once cancelled.
    pub async fn recv(&self) -> Option<ObjectManagerEvent> {
        let mut subscription = self.inner.subscription.lock().await;
        loop {
            if self.inner.token.is_cancelled() {
                return None;
            }
            let event = subscription.next().await?;
            if self.is_relevant(&event) {
                return Some(event);
            }
        }
    }

    fn is_relevant(&self, event: &ObjectManagerEvent) -> bool {
        event.path().is_descendant_of(&self.inner.scope)
            || self
                .inner
                .interface
                .is_some_and(|iface| event.involves_interface(iface))
    }

    pub fn same_channel(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_active(&self) -> bool {
        !self.inner.token.is_cancelled()
    }

    /// Stops delivery on this watch and every clone of it.
    pub fn cancel(&self) {
        if !self.inner.token.is_cancelled() {
            debug!("Cancelling object manager watch for {}", self.inner.scope);
            self.inner.token.cancel();
        }
    }
}

impl fmt::Debug for ObjectManagerWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectManagerWatch")
            .field("scope", &self.inner.scope)
            .field("interface", &self.inner.interface)
            .field("active", &self.is_active())
            .finish()
    }
}
