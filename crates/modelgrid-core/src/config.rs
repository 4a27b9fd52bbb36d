//! modelgrid.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::naming::NameLimits;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub naming: NameLimits,
    pub preferences: PreferencesConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Namespace used when a command does not name one.
    pub namespace: String,
    /// Admit non-optimized templates during selection.
    pub allow_unoptimized: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            allow_unoptimized: false,
        }
    }
}

/// Replacement preference orders, most preferred first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    pub gpu_tiers: Option<Vec<String>>,
    pub precisions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let max = crate::naming::MAX_NAME_LENGTH;
        if self.naming.max_length == 0 || self.naming.max_length > max {
            anyhow::bail!(
                "naming.max_length must be between 1 and {max}, got {}",
                self.naming.max_length
            );
        }
        if self.naming.hash_length > 64 {
            anyhow::bail!(
                "naming.hash_length must be at most 64, got {}",
                self.naming.hash_length
            );
        }
        let hash = self.naming.hash_length;
        if hash > 0 && hash + 2 > self.naming.max_length {
            anyhow::bail!(
                "naming.max_length {} leaves no room for a name part beside a {hash}-character hash",
                self.naming.max_length
            );
        }
        for (key, list) in [
            ("preferences.gpu_tiers", &self.preferences.gpu_tiers),
            ("preferences.precisions", &self.preferences.precisions),
        ] {
            if list.as_ref().is_some_and(|l| l.is_empty()) {
                anyhow::bail!("{key} must not be empty when set");
            }
        }
        Ok(())
    }
}
