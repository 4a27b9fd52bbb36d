pub mod name;
pub mod resolve;
pub mod seed;
pub mod select;

use std::path::{Path, PathBuf};

use anyhow::Context;
use modelgrid_core::EngineConfig;
use modelgrid_select::PreferenceTables;
use modelgrid_state::StateStore;
use serde::Serialize;

pub const DEFAULT_CONFIG_FILE: &str = "modelgrid.toml";
pub const DEFAULT_STORE_FILE: &str = "modelgrid.redb";

/// Configuration and store location shared by every command.
pub struct CommandContext {
    pub config: EngineConfig,
    store_path: PathBuf,
}

impl CommandContext {
    /// Read the config file (if any) and apply flag overrides.
    pub fn load(config: Option<&Path>, store: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = match config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                EngineConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))
                    .with_context(|| format!("loading {DEFAULT_CONFIG_FILE}"))?
            }
            None => EngineConfig::default(),
        };
        Ok(Self::new(config, store))
    }

    pub fn new(config: EngineConfig, store: Option<PathBuf>) -> Self {
        let store_path = store
            .or_else(|| config.store.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE));
        Self { config, store_path }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn open_store(&self) -> anyhow::Result<StateStore> {
        StateStore::open(&self.store_path)
            .with_context(|| format!("opening store {}", self.store_path.display()))
    }

    /// `namespace`, or the configured default.
    pub fn namespace<'a>(&'a self, namespace: Option<&'a str>) -> &'a str {
        namespace.unwrap_or(&self.config.engine.namespace)
    }

    pub fn preference_tables(&self) -> PreferenceTables {
        PreferenceTables::from_config(&self.config.preferences)
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_flag_overrides_config() {
        let mut config = EngineConfig::default();
        config.store.path = Some(PathBuf::from("/var/lib/modelgrid/state.redb"));

        let ctx = CommandContext::new(config.clone(), Some(PathBuf::from("local.redb")));
        assert_eq!(ctx.store_path(), Path::new("local.redb"));

        let ctx = CommandContext::new(config, None);
        assert_eq!(ctx.store_path(), Path::new("/var/lib/modelgrid/state.redb"));

        let ctx = CommandContext::new(EngineConfig::default(), None);
        assert_eq!(ctx.store_path(), Path::new(DEFAULT_STORE_FILE));
    }

    #[test]
    fn namespace_falls_back_to_config() {
        let ctx = CommandContext::new(EngineConfig::default(), None);
        assert_eq!(ctx.namespace(None), "default");
        assert_eq!(ctx.namespace(Some("team-a")), "team-a");
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modelgrid.toml");
        std::fs::write(&path, "[engine]\nnamespace = \"ml\"\n").unwrap();

        let ctx = CommandContext::load(Some(&path), None).unwrap();
        assert_eq!(ctx.namespace(None), "ml");
        assert!(CommandContext::load(Some(&dir.path().join("absent.toml")), None).is_err());
    }
}
