//! Layered YAML configuration: load, deep-merge, canonicalize, hash.
//!
//! Every binary in this workspace (CLI, daemon) loads its configuration the
//! same way: one or more `--config path.yaml` files, later files overriding
//! earlier ones key-by-key, the result canonicalized (sorted keys) so the
//! exact bytes that were executed against can be hashed and reported.

pub mod secrets;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Load + merge YAML files in order, then canonicalize to JSON and hash.
/// Later files override earlier files via deep-merge.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut sources = Vec::with_capacity(paths.len());
    for p in paths {
        let s = fs::read_to_string(p).with_context(|| format!("read config: {p}"))?;
        sources.push(s);
    }
    let refs: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&refs)
}

/// Same as [`load_layered_yaml`] but takes YAML source text directly, for
/// tests and for config delivered through channels other than the filesystem.
pub fn load_layered_yaml_from_strings(sources: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for (i, s) in sources.iter().enumerate() {
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(s).with_context(|| format!("parse yaml layer {i}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        reject_literal_secrets(&json_val)?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

/// Deep-merge: objects merge recursively; arrays replaced; scalars overwritten.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

/// Canonicalize JSON by sorting all object keys recursively and emitting compact JSON.
fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

// ---------------------------------------------------------------------------
// Secret-value rejection
// ---------------------------------------------------------------------------

/// Config YAML is checked into version control and echoed back in run
/// metadata (`config_hash`, audit entries). It must carry only env var
/// *names* for credentials (see [`secrets`]), never the credential values
/// themselves. This walks every string leaf looking for patterns that look
/// like a live secret rather than a reference to one.
fn reject_literal_secrets(v: &Value) -> Result<()> {
    match v {
        Value::String(s) => {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED: value looks like a live credential, not an env var name: {s:?}");
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                reject_literal_secrets(v)?;
            }
            Ok(())
        }
        Value::Array(arr) => {
            for v in arr {
                reject_literal_secrets(v)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn looks_like_secret(s: &str) -> bool {
    const PREFIXES: &[&str] = &["sk-", "AKIA", "-----BEGIN"];
    PREFIXES.iter().any(|p| s.starts_with(p))
}
