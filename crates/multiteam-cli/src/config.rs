use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of `multiteam.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Owner used by `project import` and `project list` when `--owner` is absent.
    #[serde(default)]
    pub default_owner: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_owner: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl CliConfig {
    /// Read the config file; a missing file yields the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        };
        let config = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {e}", path.display()))?;
        Ok(config)
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.data_dir.join("projects")
    }
}
