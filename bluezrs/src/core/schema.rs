//! Interface schema descriptors.
//!
//! A schema is plain data: the interface name, its properties with wire
//! types and access, and its methods with argument and reply types. The
//! generic [`Binding`](crate::Binding) validates every request against it
//! before touching the bus.

use bitflags::bitflags;

use crate::Result;
use crate::api::models::BluezError;
use crate::core::value::{WireType, WireValue};

bitflags! {
    /// Access a D-Bus property allows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyAccess: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySchema {
    pub name: &'static str,
    pub wire_type: WireType,
    pub access: PropertyAccess,
}

impl PropertySchema {
    pub fn is_writable(&self) -> bool {
        self.access.contains(PropertyAccess::WRITE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSchema {
    pub name: &'static str,
    pub wire_type: WireType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSchema {
    pub name: &'static str,
    pub args: &'static [ArgSchema],
    /// Reply type, `None` for methods returning nothing.
    pub reply: Option<WireType>,
}

impl MethodSchema {
    /// D-Bus input signature, e.g. `"oa{sv}"`.
    pub fn in_signature(&self) -> String {
        self.args.iter().map(|a| a.wire_type.signature()).collect()
    }

    /// Checks arity and argument types.
    pub fn check_args(&self, args: &[WireValue]) -> Result<()> {
        if args.len() != self.args.len() {
            return Err(BluezError::TypeMismatch {
                property: self.name.to_string(),
                expected: format!("{} argument(s) ({})", self.args.len(), self.in_signature()),
                found: format!("{} argument(s)", args.len()),
            });
        }
        for (schema, value) in self.args.iter().zip(args) {
            if schema.wire_type != value.wire_type() {
                return Err(BluezError::type_mismatch(schema.name, schema.wire_type, value));
            }
        }
        Ok(())
    }
}

/// Everything the binding knows about one D-Bus interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceSchema {
    pub name: &'static str,
    pub properties: &'static [PropertySchema],
    pub methods: &'static [MethodSchema],
}

impl InterfaceSchema {
    pub fn property(&self, name: &str) -> Option<&'static PropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&'static MethodSchema> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Looks up a property, reporting an absent one as [`BluezError::NotFound`].
    pub fn require_property(&self, name: &str) -> Result<&'static PropertySchema> {
        self.property(name)
            .ok_or_else(|| BluezError::NotFound(format!("property {}.{name}", self.name)))
    }

    pub fn require_method(&self, name: &str) -> Result<&'static MethodSchema> {
        self.method(name)
            .ok_or_else(|| BluezError::NotFound(format!("method {}.{name}", self.name)))
    }

    /// Validates a value about to be written to `name`.
    pub fn check_write(&self, name: &str, value: &WireValue) -> Result<&'static PropertySchema> {
        let prop = self.require_property(name)?;
        if !prop.is_writable() {
            return Err(BluezError::Permission(format!(
                "property {}.{name} is read-only",
                self.name
            )));
        }
        if prop.wire_type != value.wire_type() {
            return Err(BluezError::type_mismatch(name, prop.wire_type, value));
        }
        Ok(prop)
    }

    /// Validates a value received for `name`.
    pub fn check_read(&self, name: &str, value: &WireValue) -> Result<&'static PropertySchema> {
        let prop = self.require_property(name)?;
        if prop.wire_type != value.wire_type() {
            return Err(BluezError::type_mismatch(name, prop.wire_type, value));
        }
        Ok(prop)
    }
}
