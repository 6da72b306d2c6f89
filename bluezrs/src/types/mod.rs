//! Constants of the BlueZ D-Bus API.

pub mod constants;
