//! Remote-store configuration.
//!
//! Identifies the Firestore project and the collection that holds one
//! document per entity id. Stored at `~/.config/fieldsync/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "fieldsync";

/// Config file name
const CONFIG_FILE: &str = "config.json";

fn default_collection() -> String {
    "users".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project_id: String,
    /// Collection holding one document per entity id.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Override for the Firestore endpoint, e.g. a local emulator.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub last_entity_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            collection: default_collection(),
            base_url: None,
            last_entity_id: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_get_defaults() {
        let config: Config = serde_json::from_str(r#"{"project_id": "demo"}"#).unwrap();
        assert_eq!(config.project_id, "demo");
        assert_eq!(config.collection, "users");
        assert_eq!(config.base_url, None);
    }
}
