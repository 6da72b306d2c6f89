//! The generic binding machinery.
//!
//! Everything here is interface-agnostic: the bus seam, wire values,
//! schemas, properties records and the [`Binding`](crate::Binding) that
//! ties them together.

pub(crate) mod binding;
pub(crate) mod bus;
pub(crate) mod object_manager;
pub(crate) mod record;
pub(crate) mod schema;
pub(crate) mod value;
