//! Command handlers for the `ocn` binary.

pub mod config;
pub mod reconcile;

use anyhow::Result;
use ocn_config::{ConfigSource, LoadedConfig, NodeConfig};

/// Load from explicit `--config` paths, or from the environment when none
/// are given. Returns the loaded document, the typed config and a
/// human-readable origin.
pub(crate) fn load_node_config(
    config_paths: &[String],
) -> Result<(LoadedConfig, NodeConfig, String)> {
    let (loaded, origin) = if config_paths.is_empty() {
        let source = ConfigSource::from_env()?;
        (source.load()?, source.describe())
    } else {
        let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
        (
            ocn_config::load_layered_yaml(&path_refs)?,
            format!("files:{}", config_paths.join(",")),
        )
    };
    let cfg = NodeConfig::from_loaded(&loaded)?;
    Ok((loaded, cfg, origin))
}
