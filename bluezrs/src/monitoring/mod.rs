//! Signal-driven monitoring.
//!
//! Property change watches, object manager watches and waiting for a
//! property to reach a value.

pub(crate) mod object_manager;
pub(crate) mod properties;
pub(crate) mod wait;
