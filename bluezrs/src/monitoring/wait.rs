//! Waiting for property values using D-Bus signals.
//!
//! Subscribes to `PropertiesChanged` before reading the current value so a
//! change landing between the read and the subscription is never missed,
//! then waits for a matching change or the timeout, whichever comes first.

use futures::{FutureExt, select};
use futures_timer::Delay;
use log::{debug, warn};
use std::pin::pin;
use std::time::Duration;

use crate::Result;
use crate::api::models::BluezError;
use crate::core::binding::Binding;
use crate::core::record::PropertiesRecord;
use crate::core::value::WireValue;

impl<R: PropertiesRecord> Binding<R> {
    /// Waits until property `name` satisfies `predicate`.
    ///
    /// Returns the matching value, or [`BluezError::Timeout`] once `timeout`
    /// elapses. Closing the binding ends the wait with
    /// [`BluezError::Closed`]. The wait uses its own short-lived
    /// subscription, so it does not consume events from the binding's
    /// [`PropertyWatch`](crate::PropertyWatch).
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use bluezrs::{Adapter1, ObjectPath, WireValue, ZbusBus};
    ///
    /// # async fn example() -> bluezrs::Result<()> {
    /// let bus = ZbusBus::new().await?.shared();
    /// let adapter = Adapter1::new(bus, "org.bluez", ObjectPath::adapter("hci0")).await?;
    /// adapter.set_powered(true).await?;
    /// adapter
    ///     .wait_for_property("Powered", |v| v == &WireValue::Bool(true), Duration::from_secs(5))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn wait_for_property<F>(
        &self,
        name: &str,
        predicate: F,
        timeout: Duration,
    ) -> Result<WireValue>
    where
        F: Fn(&WireValue) -> bool,
    {
        self.ensure_open()?;
        R::SCHEMA.require_property(name)?;

        // Subscribe first to avoid racing the initial read
        let mut subscription = self.bus().subscribe_properties(self.target()).await?;
        debug!("Waiting for {}.{name} on {}", R::SCHEMA.name, self.path());

        let current = self.get_property(name).await?;
        if predicate(&current) {
            return Ok(current);
        }

        let mut timeout_delay = pin!(Delay::new(timeout).fuse());
        let mut closed = pin!(self.wait_closed().fuse());

        loop {
            let mut next_signal = pin!(subscription.next().fuse());
            select! {
                _ = closed => {
                    debug!("Binding closed while waiting for {}.{name}", R::SCHEMA.name);
                    return Err(BluezError::Closed);
                }
                _ = timeout_delay => {
                    warn!("Timed out after {timeout:?} waiting for {}.{name}", R::SCHEMA.name);
                    return Err(BluezError::Timeout);
                }
                signal = next_signal => {
                    let Some(signal) = signal else {
                        return Err(BluezError::Connection("signal stream ended".into()));
                    };
                    if signal.interface != R::SCHEMA.name {
                        continue;
                    }
                    if let Some(value) = signal.changed.get(name) {
                        if let Err(e) = R::SCHEMA.check_read(name, value) {
                            warn!("Ignoring malformed change of {name}: {e}");
                            continue;
                        }
                        if predicate(value) {
                            debug!("{}.{name} reached the expected value", R::SCHEMA.name);
                            return Ok(value.clone());
                        }
                    }
                }
            }
        }
    }
}
