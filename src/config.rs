use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::retention::RetentionRule;

/// Root of the JSON configuration file.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub systems: Vec<BackupTarget>,
}

/// One logical database to back up, with its own storage location,
/// ordered source list, and optional retention window.
#[derive(Debug, Deserialize, Clone)]
pub struct BackupTarget {
    #[serde(rename = "db_name")]
    pub database: String,
    #[serde(rename = "backup_location")]
    pub storage_dir: PathBuf,
    // Older configs in the field spell this "perfix"; keep accepting it.
    #[serde(default = "default_prefix", alias = "perfix")]
    pub prefix: String,
    pub sources: Vec<SourceEndpoint>,
    #[serde(default)]
    pub retention: Option<RetentionRule>,
}

/// One reachable instance of an Odoo server capable of serving a backup
/// for the target database.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceEndpoint {
    #[serde(rename = "url")]
    pub base_url: String,
    #[serde(rename = "db_password")]
    pub credential: String,
}

fn default_prefix() -> String {
    "odoo".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        serde_json::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.systems.is_empty() {
        anyhow::bail!("config must contain a non-empty 'systems' list");
    }

    for system in &mut config.systems {
        if system.database.is_empty() {
            anyhow::bail!("every system needs a non-empty 'db_name'");
        }
        if system.sources.is_empty() {
            anyhow::bail!(
                "system '{}' must have a non-empty 'sources' list",
                system.database
            );
        }
        if let Some(rule) = &system.retention {
            if rule.amount <= 0 {
                anyhow::bail!(
                    "system '{}': retention.amount must be > 0, got {}",
                    system.database,
                    rule.amount
                );
            }
        }
        for source in &mut system.sources {
            let trimmed = source.base_url.trim_end_matches('/');
            if trimmed.len() != source.base_url.len() {
                source.base_url = trimmed.to_string();
            }
        }
    }

    Ok(config)
}
