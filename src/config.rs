use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::worker::WorkerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Origin that manifest paths and root-relative fetches resolve against
  #[serde(default = "default_origin")]
  pub origin: Url,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Cache generation identifier; bumping it is the only way to
  /// invalidate previously cached responses
  #[serde(default = "default_version")]
  pub version: String,
  /// Paths pre-fetched at install time
  #[serde(default = "default_manifest")]
  pub manifest: Vec<String>,
  /// Path suffixes that qualify for runtime caching (the root path "/"
  /// always qualifies as an exact match)
  #[serde(default = "default_runtime_suffixes")]
  pub runtime_suffixes: Vec<String>,
  /// Override of the SQLite database path (defaults to the platform data
  /// directory)
  pub db_path: Option<PathBuf>,
}

fn default_origin() -> Url {
  Url::parse("http://localhost:3000").expect("static origin URL")
}

fn default_version() -> String {
  "flag-game-v1.0.2".to_string()
}

fn default_manifest() -> Vec<String> {
  ["/", "/favicon.ico", "/manifest.json", "/icon-192.png", "/icon-512.png"]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_runtime_suffixes() -> Vec<String> {
  [".js", ".css", ".png", ".ico", ".json"]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for Config {
  fn default() -> Self {
    Self {
      origin: default_origin(),
      cache: CacheConfig::default(),
    }
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: default_version(),
      manifest: default_manifest(),
      runtime_suffixes: default_runtime_suffixes(),
      db_path: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ocw.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ocw/config.yaml
  ///
  /// With no file found, built-in defaults apply so the tool runs
  /// configless.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("ocw.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ocw").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Worker configuration derived from this file config.
  pub fn worker_config(&self) -> WorkerConfig {
    WorkerConfig {
      version: self.cache.version.clone(),
      origin: self.origin.clone(),
      manifest: self.cache.manifest.clone(),
      runtime_suffixes: self.cache.runtime_suffixes.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.origin.as_str(), "http://localhost:3000/");
    assert_eq!(config.cache.version, "flag-game-v1.0.2");
    assert_eq!(config.cache.manifest.len(), 5);
    assert_eq!(config.cache.manifest[0], "/");
    assert!(config.cache.runtime_suffixes.contains(&".json".to_string()));
  }

  #[test]
  fn test_partial_yaml_fills_defaults() {
    let config: Config = serde_yaml::from_str(
      "origin: https://flags.example.net\ncache:\n  version: flag-game-v2.0.0\n",
    )
    .unwrap();
    assert_eq!(config.origin.as_str(), "https://flags.example.net/");
    assert_eq!(config.cache.version, "flag-game-v2.0.0");
    // Unspecified fields fall back to defaults
    assert_eq!(config.cache.manifest.len(), 5);
    assert!(config.cache.db_path.is_none());
  }
}
