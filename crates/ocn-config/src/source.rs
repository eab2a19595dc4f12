//! Where the node config comes from when no `--config` paths are given.
//!
//! `OCN_CONFIG_JSON` (inline document) wins over `OCN_CONFIG_FILE_PATH`.
//! Neither being set is an error: a node with no declared actors has
//! nothing to reconcile.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::{load_layered_yaml, load_layered_yaml_from_strings, LoadedConfig};

pub const ENV_CONFIG_JSON: &str = "OCN_CONFIG_JSON";
pub const ENV_CONFIG_FILE_PATH: &str = "OCN_CONFIG_FILE_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Inline(String),
    File(PathBuf),
}

impl ConfigSource {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var(ENV_CONFIG_JSON).ok(),
            std::env::var(ENV_CONFIG_FILE_PATH).ok(),
        )
    }

    /// Blank values count as unset.
    pub fn from_vars(inline_json: Option<String>, file_path: Option<String>) -> Result<Self> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(json) = non_blank(inline_json) {
            return Ok(ConfigSource::Inline(json));
        }
        if let Some(path) = non_blank(file_path) {
            return Ok(ConfigSource::File(PathBuf::from(path.trim())));
        }
        bail!(
            "CONFIG_NOT_FOUND: set {} (inline JSON) or {} (path to a config file)",
            ENV_CONFIG_JSON,
            ENV_CONFIG_FILE_PATH
        );
    }

    pub fn describe(&self) -> String {
        match self {
            ConfigSource::Inline(_) => format!("env:{ENV_CONFIG_JSON}"),
            ConfigSource::File(p) => format!("file:{}", p.display()),
        }
    }

    pub fn load(&self) -> Result<LoadedConfig> {
        match self {
            ConfigSource::Inline(json) => load_layered_yaml_from_strings(&[json.as_str()])
                .with_context(|| format!("failed to load config from {ENV_CONFIG_JSON}")),
            ConfigSource::File(path) => {
                let p = path
                    .to_str()
                    .with_context(|| format!("config path is not utf-8: {}", path.display()))?;
                load_layered_yaml(&[p])
            }
        }
    }
}
