//! Access Gate
//!
//! Narrows the catalog to what a role may see. The scoped view is used twice
//! per request: rendered into the translation prompt, and again to reject any
//! decoded action that names something outside it.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::catalog::{SchemaCatalog, SchemaEntity};
use crate::action::ActionDescriptor;
use crate::error::AccessError;

/// Rendered in place of the schema when a role can see nothing
pub const NO_ACCESSIBLE_ENTITIES: &str =
    "NO ACCESSIBLE ENTITIES: this role has no permission to query any table.";

/// Fields every Odoo model has even when the catalog does not list them
const IMPLICIT_FIELDS: [&str; 2] = ["id", "display_name"];

/// The caller's role and the entities it may read
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleContext {
    pub role: String,
    #[serde(default, alias = "permissions", alias = "allowed_models")]
    pub permitted_entities: BTreeSet<String>,
}

impl RoleContext {
    pub fn new<I, S>(role: impl Into<String>, permitted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: role.into(),
            permitted_entities: permitted.into_iter().map(Into::into).collect(),
        }
    }

    pub fn permits(&self, entity: &str) -> bool {
        self.permitted_entities.contains(entity)
    }
}

/// Produces per-role views of the shared catalog
#[derive(Debug, Clone)]
pub struct AccessGate {
    catalog: Arc<SchemaCatalog>,
}

impl AccessGate {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Entities of the catalog the role may read, in catalog order.
    /// Permitted names missing from the catalog are ignored.
    pub fn scoped_schema(&self, role: &RoleContext) -> ScopedSchema {
        let entities = self
            .catalog
            .entities()
            .iter()
            .filter(|e| role.permits(&e.name))
            .cloned()
            .collect();
        ScopedSchema {
            role: role.role.clone(),
            entities,
        }
    }
}

/// The subset of the catalog visible to one role
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedSchema {
    role: String,
    entities: Vec<SchemaEntity>,
}

impl ScopedSchema {
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn entities(&self) -> &[SchemaEntity] {
        &self.entities
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity(&self, name: &str) -> Option<&SchemaEntity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Human-readable schema for the translation prompt
    pub fn describe(&self) -> String {
        if self.entities.is_empty() {
            return NO_ACCESSIBLE_ENTITIES.to_string();
        }

        let mut out = String::new();
        for entity in &self.entities {
            let _ = write!(out, "TABLE: {}", entity.name);
            if !entity.label.is_empty() {
                let _ = write!(out, " ({})", entity.label);
            }
            out.push('\n');
            if !entity.description.is_empty() {
                let _ = writeln!(out, "  {}", entity.description);
            }
            for field in &entity.fields {
                let _ = write!(out, "  - {}", field.name);
                if !field.description.is_empty() {
                    let _ = write!(out, ": {}", field.description);
                }
                out.push('\n');
                for hint in &field.values {
                    if hint.keywords.is_empty() {
                        let _ = writeln!(out, "      value '{}'", hint.value);
                    } else {
                        let _ = writeln!(
                            out,
                            "      value '{}' <- {}",
                            hint.value,
                            hint.keywords.join(", ")
                        );
                    }
                }
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }

    /// Reject an action that reaches outside this view
    pub fn authorize(&self, action: &ActionDescriptor) -> Result<(), AccessError> {
        let (entity_name, fields, order): (&str, &[String], Option<&str>) = match action {
            ActionDescriptor::NoAction { .. } => return Ok(()),
            ActionDescriptor::Count(c) => (c.entity.as_str(), &[], None),
            ActionDescriptor::Query(q) => (q.entity.as_str(), &q.fields, q.order.as_deref()),
        };

        let entity = self
            .entity(entity_name)
            .ok_or_else(|| AccessError::EntityNotPermitted {
                role: self.role.clone(),
                entity: entity_name.to_string(),
            })?;

        let columns = action
            .filters()
            .iter()
            .map(|f| f.column.as_str())
            .chain(fields.iter().map(String::as_str))
            .chain(order.into_iter().flat_map(|o| order_columns(o)));

        for column in columns {
            if !IMPLICIT_FIELDS.contains(&column) && !entity.has_field(column) {
                return Err(AccessError::FieldNotPermitted {
                    entity: entity.name.clone(),
                    field: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Column names of an order clause like `"date_order desc, name"`
fn order_columns(order: &str) -> impl Iterator<Item = &str> {
    order
        .split(',')
        .filter_map(|part| part.split_whitespace().next())
}
