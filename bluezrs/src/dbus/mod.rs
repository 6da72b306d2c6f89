//! zbus transport.
//!
//! Proxy declarations, value conversion, the [`Bus`](crate::Bus)
//! implementation over a real connection and the exported agent and
//! advertisement objects.

pub(crate) mod bus;
pub(crate) mod convert;
pub(crate) mod export;
pub(crate) mod proxies;
