//! ocn-config
//!
//! Layered YAML/JSON loading with a stable content hash, a guard against
//! literal secrets, and the typed node configuration built on top of it.

use std::fs;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

mod layer;
pub mod node;
pub mod source;

pub use node::{LedgerConfig, NodeConfig, RetryConfig, WalletConfig};
pub use source::{ConfigSource, ENV_CONFIG_FILE_PATH, ENV_CONFIG_JSON};

use layer::LayerValue;

/// Literal prefixes that only ever start key material.
const SECRET_PREFIXES: &[&str] = &["-----BEGIN", "xprv", "tprv"];

/// A run of this many lowercase words reads as a seed phrase.
const MNEMONIC_MIN_WORDS: usize = 12;

/// A merged config document plus its identity.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// SHA-256 (hex) of `canonical_json`.
    pub config_hash: String,
    /// Sorted-key compact JSON; the exact bytes that were hashed.
    pub canonical_json: String,
    pub config_json: Value,
}

/// Read each file and merge them in the order given.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let layers = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read config path: {p}")))
        .collect::<Result<Vec<String>>>()?;

    let layer_refs: Vec<&str> = layers.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&layer_refs)
}

/// Merge documents in order: earlier docs are base, later docs override.
///
/// JSON is valid YAML, so inline JSON configs go through here as well.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());
    for (idx, raw) in yaml_docs.iter().enumerate() {
        let LayerValue(layer) = serde_yaml::from_str(raw)
            .with_context(|| format!("invalid yaml in config layer #{idx}"))?;
        // A comment-only layer parses as null and contributes nothing.
        if !layer.is_null() {
            merge_layer(&mut merged, layer);
        }
    }

    if let Some(leaf) = find_secret_leaf(&merged, String::new()) {
        bail!("CONFIG_SECRET_DETECTED leaf={leaf} value=REDACTED");
    }

    // serde_json::Map is a BTreeMap without `preserve_order`, so keys serialize sorted.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; anything else in `layer` replaces `base`.
/// Arrays (worker / reputer lists) are therefore replaced whole.
fn merge_layer(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_layer(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// JSON pointer of the first string leaf that looks like key material.
fn find_secret_leaf(v: &Value, pointer: String) -> Option<String> {
    match v {
        Value::String(s) if looks_like_secret(s) => Some(if pointer.is_empty() {
            "/".to_string()
        } else {
            pointer
        }),
        Value::Object(map) => map.iter().find_map(|(k, child)| {
            let token = k.replace('~', "~0").replace('/', "~1");
            find_secret_leaf(child, format!("{pointer}/{token}"))
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, child)| find_secret_leaf(child, format!("{pointer}/{i}"))),
        _ => None,
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    if SECRET_PREFIXES.iter().any(|p| t.starts_with(p)) {
        return true;
    }
    // Raw 32-byte hex private key.
    if t.len() == 64 && t.chars().all(|c| c.is_ascii_hexdigit()) {
        return true;
    }
    looks_like_mnemonic(t)
}

fn looks_like_mnemonic(s: &str) -> bool {
    let words: Vec<&str> = s.split_whitespace().collect();
    words.len() >= MNEMONIC_MIN_WORDS
        && words
            .iter()
            .all(|w| w.chars().all(|c| c.is_ascii_lowercase()))
}
