//! Schema Catalog
//!
//! Immutable registry of the entities the assistant may query, with the
//! field descriptions and status keywords the language model needs to build
//! correct filters. Loaded once at startup and shared behind an `Arc`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const BUILTIN_CATALOG: &str = include_str!("default_catalog.yaml");

/// A domain value a field can take, with the words users say for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueHint {
    pub value: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// One field of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ValueHint>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: &str, keywords: &[&str]) -> Self {
        self.values.push(ValueHint {
            value: value.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        });
        self
    }
}

/// A named record type in the store (e.g. `res.partner`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntity {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<FieldSpec>,
}

impl SchemaEntity {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            description: String::new(),
            fields,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    entities: Vec<SchemaEntity>,
}

/// The full, process-wide entity catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCatalog {
    entities: Vec<SchemaEntity>,
}

impl SchemaCatalog {
    /// Build a catalog, rejecting blank or duplicate entity and field names
    pub fn from_entities(entities: Vec<SchemaEntity>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for entity in &entities {
            if entity.name.trim().is_empty() {
                return Err(ConfigError::Catalog("entity with empty name".to_string()));
            }
            if !seen.insert(entity.name.as_str()) {
                return Err(ConfigError::Catalog(format!(
                    "duplicate entity '{}'",
                    entity.name
                )));
            }
            let mut fields = HashSet::new();
            for field in &entity.fields {
                if field.name.trim().is_empty() {
                    return Err(ConfigError::Catalog(format!(
                        "entity '{}' has a field with an empty name",
                        entity.name
                    )));
                }
                if !fields.insert(field.name.as_str()) {
                    return Err(ConfigError::Catalog(format!(
                        "duplicate field '{}' in entity '{}'",
                        field.name, entity.name
                    )));
                }
            }
        }
        Ok(Self { entities })
    }

    /// The catalog shipped with the crate (customers, sales orders, products)
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml_str(BUILTIN_CATALOG, "<builtin catalog>")
    }

    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: origin.to_string(),
            source,
        })?;
        Self::from_entities(file.entities)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml, &path.display().to_string())
    }

    /// Load from `path` when given, otherwise fall back to the builtin catalog
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    pub fn entity(&self, name: &str) -> Option<&SchemaEntity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entities(&self) -> &[SchemaEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
