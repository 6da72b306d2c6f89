//! Property change watches.

use log::{debug, warn};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::api::models::PropertyChanged;
use crate::core::bus::{PropertiesChangedSignal, SignalSubscription};
use crate::core::record::PropertiesRecord;

/// A live stream of property changes for one binding.
///
/// Cloning a watch yields another handle to the same channel; a binding
/// hands out the same watch until it is unwatched or closed. Each received
/// change is also applied to the binding's properties record before it is
/// returned.
pub struct PropertyWatch<R: PropertiesRecord> {
    inner: Arc<WatchInner<R>>,
}

struct WatchInner<R> {
    state: Mutex<WatchState>,
    token: CancellationToken,
    record: Arc<RwLock<R>>,
}

struct WatchState {
    subscription: SignalSubscription<PropertiesChangedSignal>,
    pending: VecDeque<PropertyChanged>,
}

impl<R: PropertiesRecord> PropertyWatch<R> {
    pub(crate) fn new(
        subscription: SignalSubscription<PropertiesChangedSignal>,
        record: Arc<RwLock<R>>,
    ) -> Self {
        let token = subscription.token();
        Self {
            inner: Arc::new(WatchInner {
                state: Mutex::new(WatchState {
                    subscription,
                    pending: VecDeque::new(),
                }),
                token,
                record,
            }),
        }
    }

    /// Waits for the next change.
    ///
    /// Returns `None` once the watch has been released, the binding closed,
    /// or the bus subscription ended. Changes for other interfaces on the
    /// same object are skipped, as are changes that do not fit the schema.
    pub async fn recv(&self) -> Option<PropertyChanged> {
        let mut state = self.inner.state.lock().await;
        loop {
            if self.inner.token.is_cancelled() {
                return None;
            }
            if let Some(change) = state.pending.pop_front() {
                return Some(change);
            }
            let signal = state.subscription.next().await?;
            if signal.interface != R::SCHEMA.name {
                continue;
            }
            let changes = self.absorb(signal).await;
            state.pending.extend(changes);
        }
    }

    /// Applies one signal to the record and splits it into per-property
    /// events.
    async fn absorb(&self, signal: PropertiesChangedSignal) -> Vec<PropertyChanged> {
        let PropertiesChangedSignal {
            path,
            interface,
            changed,
            invalidated,
        } = signal;

        let mut record = self.inner.record.write().await;
        let mut events = Vec::with_capacity(changed.len() + invalidated.len());

        for (name, value) in changed {
            if let Err(e) = record.apply(&name, Some(&value)) {
                warn!("Skipping change of {name} on {path}: {e}");
                continue;
            }
            events.push(PropertyChanged {
                interface: interface.clone(),
                path: path.clone(),
                name,
                value: Some(value),
            });
        }

        for name in invalidated {
            if let Err(e) = record.apply(&name, None) {
                warn!("Skipping invalidation of {name} on {path}: {e}");
                continue;
            }
            events.push(PropertyChanged {
                interface: interface.clone(),
                path: path.clone(),
                name,
                value: None,
            });
        }

        events
    }

    /// Returns `true` if both handles refer to the same channel.
    pub fn same_channel(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns `true` until the watch is released.
    pub fn is_active(&self) -> bool {
        !self.inner.token.is_cancelled()
    }

    pub(crate) fn cancel(&self) {
        if !self.inner.token.is_cancelled() {
            debug!("Releasing {} property watch", R::SCHEMA.name);
            self.inner.token.cancel();
        }
    }
}

impl<R: PropertiesRecord> Clone for PropertyWatch<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: PropertiesRecord> fmt::Debug for PropertyWatch<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyWatch")
            .field("interface", &R::SCHEMA.name)
            .field("active", &self.is_active())
            .finish()
    }
}
