use std::{
  fs,
  path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use serde_yaml::Value;
use tracing::{info, warn};

use crate::{utils, NodeError, Role};

/// Mode written to `write-kubeconfig-mode` on every generated config
pub const KUBECONFIG_MODE: &str = "0644";

/// A scalar value in the RKE2 config file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
  Str(String),
  Bool(bool),
}

/// Key-ordered RKE2 configuration document
///
/// Renders one `key: value` line per entry in insertion order so the
/// generated file is byte-for-byte deterministic
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigDocument {
  entries: Vec<(String, ConfigValue)>,
}

impl ConfigDocument {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set a key, replacing the value in place if the key already exists
  pub fn set<K: Into<String>>(&mut self, key: K, value: ConfigValue) -> &mut Self {
    let key = key.into();
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some((_, v)) => *v = value,
      None => self.entries.push((key, value)),
    }
    self
  }

  pub fn get(&self, key: &str) -> Option<&ConfigValue> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn render(&self) -> Result<String> {
    let mut out = String::new();
    for (key, value) in &self.entries {
      let value = match value {
        // A JSON string is also a valid double-quoted YAML scalar
        ConfigValue::Str(s) => serde_json::to_string(s)?,
        ConfigValue::Bool(b) => b.to_string(),
      };
      out.push_str(&format!("{key}: {value}\n"));
    }

    Ok(out)
  }

  /// Parse a flat document of scalar values
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let mut doc = ConfigDocument::new();
    let mapping: serde_yaml::Mapping = match serde_yaml::from_str::<Value>(contents)? {
      Value::Mapping(m) => m,
      Value::Null => return Ok(doc),
      _ => return Err(anyhow!("Config document is not a mapping")),
    };

    for (key, value) in mapping {
      let key = key.as_str().ok_or_else(|| anyhow!("Config keys must be strings"))?.to_owned();
      let value = match value {
        Value::Bool(b) => ConfigValue::Bool(b),
        Value::String(s) => ConfigValue::Str(s),
        Value::Number(n) => ConfigValue::Str(n.to_string()),
        _ => return Err(anyhow!("Unsupported value for '{key}'")),
      };
      doc.set(key, value);
    }

    Ok(doc)
  }
}

/// Flags that feed config materialization
#[derive(Clone, Debug, Default)]
pub struct ConfigOptions {
  pub config_file: Option<PathBuf>,
  pub token: Option<String>,
  pub token_file: Option<PathBuf>,
  pub server_url: Option<String>,
  pub cluster_init: bool,
}

/// What `materialize` did to the canonical config file
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Materialized {
  /// Explicit config file copied over the canonical location
  Copied,
  /// Config generated from flags
  Generated,
  /// Existing config left untouched
  Kept,
}

/// Resolve the cluster join token
///
/// An inline token takes precedence; the token file is only read when no
/// inline token was supplied
pub fn resolve_token(token: Option<&str>, token_file: Option<&Path>) -> Result<Option<String>> {
  if let Some(token) = token {
    return Ok(Some(token.to_owned()));
  }

  match token_file {
    Some(path) => {
      if !path.is_file() {
        return Err(NodeError::NotFound(path.to_path_buf()).into());
      }
      let token = fs::read_to_string(path)?.trim().to_owned();
      match token.is_empty() {
        true => Err(NodeError::Validation(format!("token file {path:?} is empty")).into()),
        false => Ok(Some(token)),
      }
    }
    None => Ok(None),
  }
}

/// Build the generated config document for a role
pub fn build_document(role: Role, opts: &ConfigOptions) -> Result<ConfigDocument> {
  let token = resolve_token(opts.token.as_deref(), opts.token_file.as_deref())?;
  let mut doc = ConfigDocument::new();

  match role {
    Role::Agent => {
      let token = token.ok_or_else(|| NodeError::Validation("agent role requires --token or --token-file".into()))?;
      let server = opts
        .server_url
        .clone()
        .ok_or_else(|| NodeError::Validation("agent role requires --server-url".into()))?;

      doc.set("token", ConfigValue::Str(token));
      doc.set("server", ConfigValue::Str(server));
    }
    Role::Server => {
      if let Some(token) = token {
        doc.set("token", ConfigValue::Str(token));
      }
      if let Some(url) = &opts.server_url {
        warn!("--server-url {url} is only used by agents; ignoring");
      }
      if opts.cluster_init {
        doc.set("cluster-init", ConfigValue::Bool(true));
      }
    }
  }
  doc.set("write-kubeconfig-mode", ConfigValue::Str(KUBECONFIG_MODE.to_owned()));

  Ok(doc)
}

/// Produce the config file consumed by the RKE2 service
///
/// An explicit config file always overwrites the target. Otherwise a config is
/// generated from flags, unless the target already exists, which is never clobbered
pub fn materialize<P: AsRef<Path>>(role: Role, opts: &ConfigOptions, target: P) -> Result<Materialized> {
  let target = target.as_ref();

  if let Some(source) = &opts.config_file {
    if !source.is_file() {
      return Err(NodeError::NotFound(source.clone()).into());
    }
    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::copy(source, target)?;
    info!("Copied {source:?} to {target:?}");
    return Ok(Materialized::Copied);
  }

  if target.exists() {
    warn!("{target:?} already exists and will not be modified; pass --config to replace it");
    return Ok(Materialized::Kept);
  }

  let doc = build_document(role, opts)?;
  utils::write_file(doc.render()?.as_bytes(), target, Some(0o600))?;
  info!("Wrote {target:?}");

  Ok(Materialized::Generated)
}
