//! Platform registry: the immutable table of upstream tenants.
//!
//! Populated once at startup from a TOML file and shared read-only by every
//! adapter instance. No mutation is exposed after load.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::GatewayError;

/// One upstream tenant: credential, endpoint and display metadata.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlatformConfig {
    pub id: String,
    pub api_key: String,
    pub base_url: String,
    #[serde(default)]
    pub description: String,
    /// Advisory input/output field descriptors for this platform's app.
    /// Never enforced; only surfaced to callers that want to introspect.
    #[serde(default)]
    pub schema: Option<DeclaredSchema>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DeclaredSchema {
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct PlatformsFile {
    default_platform: Option<String>,
    #[serde(default)]
    platforms: Vec<PlatformConfig>,
}

/// Immutable id → [`PlatformConfig`] mapping with stable iteration order.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    platforms: BTreeMap<String, PlatformConfig>,
    default_platform: Option<String>,
}

impl PlatformRegistry {
    pub fn from_configs(configs: impl IntoIterator<Item = PlatformConfig>) -> Self {
        let platforms = configs
            .into_iter()
            .map(|config| (config.id.clone(), config))
            .collect();
        PlatformRegistry {
            platforms,
            default_platform: None,
        }
    }

    pub fn load() -> Result<PlatformRegistry, Box<dyn std::error::Error>> {
        Self::load_from_path(&Self::config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<PlatformRegistry, Box<dyn std::error::Error>> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let file: PlatformsFile = toml::from_str(&contents)?;
            let mut registry = Self::from_configs(file.platforms);
            registry.default_platform = file.default_platform;
            Ok(registry)
        } else {
            Ok(PlatformRegistry::default())
        }
    }

    pub fn config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("", "", "dify-gateway")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("platforms.toml")
    }

    /// Look up a platform by id. Fails with [`GatewayError::UnknownPlatform`]
    /// before any network call is made.
    pub fn resolve(&self, id: &str) -> Result<&PlatformConfig, GatewayError> {
        self.platforms
            .get(id)
            .ok_or_else(|| GatewayError::UnknownPlatform {
                id: id.to_string(),
                available: self.platforms.keys().cloned().collect(),
            })
    }

    /// Ordered id → description mapping, suitable for advertising choices.
    pub fn list_available(&self) -> BTreeMap<String, String> {
        self.platforms
            .iter()
            .map(|(id, config)| (id.clone(), config.description.clone()))
            .collect()
    }

    pub fn default_platform(&self) -> Option<&str> {
        self.default_platform.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}
