//! Generation-time overrides, built in code or loaded from YAML.
//!
//! ```yaml
//! api_title: Pet Store (staging)
//! api_version: 1.2.0
//! servers:
//!   - url: https://staging.example.com
//!     description: staging
//! ```

use crate::spec::Server;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Overrides applied on top of the [`ApiDefinition`](super::ApiDefinition).
/// Every value set here wins over the definition's own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Server>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openapi_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl GeneratorOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn server(mut self, server: Server) -> Self {
        self.servers.get_or_insert_with(Vec::new).push(server);
        self
    }

    #[must_use]
    pub fn openapi_version(mut self, version: impl Into<String>) -> Self {
        self.openapi_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn api_title(mut self, title: impl Into<String>) -> Self {
        self.api_title = Some(title.into());
        self
    }

    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse generator options")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read generator options from {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid generator options in {}", path.display()))
    }
}
