use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::generate::GeneratorConfig;
use crate::quality::check::SAMPLE_LIMIT;

/// Settings read from `engage.toml`; command-line flags override them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub database: PathBuf,
    pub export_dir: PathBuf,
    pub report_path: PathBuf,
    pub sample_limit: usize,
    pub preview_rows: usize,
    pub generator: GeneratorConfig,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("data").join("engagement.db"),
            export_dir: PathBuf::from("data").join("exports"),
            report_path: PathBuf::from("data").join("data_quality_report.md"),
            sample_limit: SAMPLE_LIMIT,
            preview_rows: 100,
            generator: GeneratorConfig::default(),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("engage.toml")
}

/// Load the config file, or `None` when it does not exist.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<EtlConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: EtlConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    config.generator.validate()?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &EtlConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
