//! Configuration loading and database path resolution

use crate::reference::{CatalogEntry, RudimentCatalog};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// TOML configuration file contents.
///
/// Everything is optional; a missing file or field falls back to compiled
/// defaults rather than failing startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Database file path
    pub db_path: Option<PathBuf>,

    /// Global rudiment catalog entries; replaces the compiled default
    /// catalog when non-empty
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

impl TomlConfig {
    /// Load the platform config file, if one exists.
    ///
    /// A missing file yields the default config; a present but malformed
    /// file is a configuration error.
    pub fn load() -> Result<Self> {
        let Some(path) = config_file_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// The catalog this config selects: its own entries when present,
    /// otherwise the compiled default
    pub fn catalog(&self) -> RudimentCatalog {
        if self.catalog.is_empty() {
            RudimentCatalog::compiled_default()
        } else {
            RudimentCatalog::new(self.catalog.clone())
        }
    }
}

/// Resolve the database path in priority order:
/// 1. Command-line argument
/// 2. `DRILLBOOK_DB` environment variable
/// 3. `db_path` in the config file
/// 4. OS-dependent default data directory
pub fn resolve_db_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("DRILLBOOK_DB") {
        return PathBuf::from(path);
    }
    if let Some(path) = &config.db_path {
        return path.clone();
    }
    default_db_path()
}

fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("drillbook").join("config.toml"));
    if let Some(path) = &user_config {
        if path.exists() {
            return user_config;
        }
    }
    let system_config = PathBuf::from("/etc/drillbook/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }
    user_config
}

/// OS-dependent default database location
fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("drillbook").join("drillbook.db"))
        .unwrap_or_else(|| PathBuf::from("./drillbook_data/drillbook.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_selects_compiled_catalog() {
        let config = TomlConfig::default();
        assert_eq!(config.catalog().label_for("paradiddle-1"), Some("Paradiddle"));
    }

    #[test]
    fn configured_catalog_replaces_compiled_one() {
        let config: TomlConfig = toml::from_str(
            r#"
            [[catalog]]
            id = "flam-tap"
            label = "Flam Tap"
            "#,
        )
        .unwrap();
        let catalog = config.catalog();
        assert_eq!(catalog.label_for("flam-tap"), Some("Flam Tap"));
        assert_eq!(catalog.label_for("paradiddle-1"), None);
    }

    #[test]
    fn cli_argument_wins_db_path_resolution() {
        let config: TomlConfig = toml::from_str(r#"db_path = "/from/config.db""#).unwrap();
        let path = resolve_db_path(Some(Path::new("/from/cli.db")), &config);
        assert_eq!(path, PathBuf::from("/from/cli.db"));
    }
}
