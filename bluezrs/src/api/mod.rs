//! Public API module.
//!
//! Models, errors, bus configuration and the application aggregate.

pub mod app;
pub mod config;
pub mod models;
