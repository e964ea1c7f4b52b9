//! Role Directory
//!
//! Maps role names to the entities they may read. The server and CLI accept
//! a bare role name and resolve it here into a [`RoleContext`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::access::RoleContext;
use crate::error::ConfigError;

const BUILTIN_ROLES: &str = include_str!("default_roles.yaml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub allowed_models: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RolesFile {
    roles: Vec<RoleDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDirectory {
    roles: Vec<RoleDefinition>,
}

impl RoleDirectory {
    pub fn new(roles: Vec<RoleDefinition>) -> Self {
        Self { roles }
    }

    /// Admin, Yönetici and Personel
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml_str(BUILTIN_ROLES, "<builtin roles>")
    }

    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: RolesFile = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: origin.to_string(),
            source,
        })?;
        Ok(Self::new(file.roles))
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml, &path.display().to_string())
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RoleDefinition> {
        self.roles.iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|r| r.name.as_str())
    }

    pub fn roles(&self) -> &[RoleDefinition] {
        &self.roles
    }

    /// Unknown names get a context with no permitted entities
    pub fn resolve(&self, name: &str) -> RoleContext {
        match self.get(name) {
            Some(def) => RoleContext::new(def.name.clone(), def.allowed_models.iter().cloned()),
            None => {
                warn!("Unknown role '{}'; granting no entities", name);
                RoleContext::new(name, Vec::<String>::new())
            }
        }
    }
}
