use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// One building tower managed by this installation. The unit count is fixed
/// per building configuration and drives the aliquot split.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TowerConfig {
    pub id: String,
    pub name: String,
    pub unit_count: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BcvProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub bcv: Option<BcvProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            bcv: Some(BcvProviderConfig {
                base_url: "https://pydolarve.org".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub towers: Vec<TowerConfig>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ve", "ofv", "alicuota")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("ve", "ofv", "alicuota")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn tower(&self, tower_id: &str) -> Result<&TowerConfig> {
        self.towers
            .iter()
            .find(|t| t.id == tower_id)
            .with_context(|| format!("Tower '{tower_id}' is not configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
towers:
  - id: "torre-a"
    name: "Torre A"
    unit_count: 16
  - id: "torre-b"
    name: "Torre B"
    unit_count: 24
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.towers.len(), 2);
        assert_eq!(config.towers[0].id, "torre-a");
        assert_eq!(config.towers[0].unit_count, 16);
        assert!(config.providers.bcv.is_some());
        assert_eq!(
            config.providers.bcv.as_ref().unwrap().base_url,
            "https://pydolarve.org".to_string()
        );

        let yaml_str_with_provider = r#"
towers:
  - id: "torre-a"
    name: "Torre A"
    unit_count: 16
providers:
  bcv:
    base_url: "http://example.com/bcv"
data_path: "/tmp/alicuota-data"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str_with_provider).unwrap();
        assert_eq!(
            config.providers.bcv.as_ref().unwrap().base_url,
            "http://example.com/bcv"
        );
        assert_eq!(config.data_path.as_deref(), Some("/tmp/alicuota-data"));

        assert!(config.tower("torre-a").is_ok());
        assert!(config.tower("torre-z").is_err());
    }
}
