use anyhow::Result;

use super::load_node_config;

/// `ocn config-hash`: merge, hash, print. No schema check.
pub fn config_hash(paths: &[String]) -> Result<()> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = ocn_config::load_layered_yaml(&path_refs)?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

/// `ocn validate`: full load + schema + semantic validation.
pub fn validate(config_paths: &[String]) -> Result<()> {
    let (loaded, cfg, origin) = load_node_config(config_paths)?;

    println!("config_source={}", origin);
    println!("config_hash={}", loaded.config_hash);
    println!("address={}", cfg.identity());
    println!("submit_tx={}", cfg.wallet.submit_tx);
    println!("workers={}", cfg.worker.len());
    println!("reputers={}", cfg.reputer.len());
    println!("valid=true");
    Ok(())
}
