//! Helpers shared by applications built on the bindings.

pub mod uuid;

pub use self::uuid::{app_path, normalize_uuid, short_alias, uuid_from_alias};
