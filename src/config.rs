use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

/// Crate settings, deserialized from `.depscan/config.toml`.
///
/// Controls where the local naming dataset lives and where its remote copy is
/// published.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the local naming dataset and its marker file.
    pub dataset_dir: PathBuf,
    /// Remote metadata resource carrying `lastModifiedDate=<epoch millis>`.
    pub dataset_meta_url: String,
    /// Remote full-dataset export.
    pub dataset_url: String,
    /// Optional proxy URL used for full-dataset downloads.
    pub proxy_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depscan");
        Settings {
            dataset_dir: data_dir.join("cpe"),
            dataset_meta_url:
                "https://static.nvd.nist.gov/feeds/xml/cpe/dictionary/official-cpe-dictionary_v2.3.meta"
                    .to_string(),
            dataset_url:
                "https://static.nvd.nist.gov/feeds/xml/cpe/dictionary/official-cpe-dictionary_v2.3.xml.gz"
                    .to_string(),
            proxy_url: None,
        }
    }
}

/// Load settings, searching in order:
///
/// 1. `config_override` — an explicit path supplied by the caller
/// 2. `<base_path>/.depscan/config.toml`
/// 3. `~/.config/depscan/config.toml`
/// 4. Built-in [`Settings::default`]
pub fn load_settings(base_path: &Path, config_override: Option<&Path>) -> Result<Settings> {
    if let Some(path) = config_override {
        let content = std::fs::read_to_string(path)?;
        return Ok(toml::from_str(&content)?);
    }

    let project_config = base_path.join(".depscan").join("config.toml");
    if project_config.exists() {
        let content = std::fs::read_to_string(&project_config)?;
        return Ok(toml::from_str(&content)?);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("depscan").join("config.toml");
        if home_config.exists() {
            let content = std::fs::read_to_string(&home_config)?;
            return Ok(toml::from_str(&content)?);
        }
    }

    Ok(Settings::default())
}
