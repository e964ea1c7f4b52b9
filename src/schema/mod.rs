//! Schema catalog, role directory and the access gate built on them

pub mod access;
pub mod catalog;
pub mod roles;

pub use access::{AccessGate, RoleContext, ScopedSchema, NO_ACCESSIBLE_ENTITIES};
pub use catalog::{FieldSpec, SchemaCatalog, SchemaEntity, ValueHint};
pub use roles::{RoleDefinition, RoleDirectory};
