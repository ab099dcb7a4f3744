use std::path::PathBuf;

use anyhow::{
  Context,
  Result,
};
use serde::Deserialize;
use the_script::DiffOptions;

/// Built-in default.toml.
pub const DEFAULT_CONFIG: &str = include_str!("default.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
  /// History file, `None` for [`default_store_file`](crate::default_store_file).
  pub store: Option<PathBuf>,
  pub owner: u64,
  pub diff:  DiffConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      store: None,
      owner: 0,
      diff:  DiffConfig::default(),
    }
  }
}

impl Config {
  pub fn from_toml(value: toml::Value) -> Result<Self> {
    value.try_into().context("invalid configuration")
  }

  /// The configured history file with `~` expanded, or the default location.
  pub fn store_file(&self) -> PathBuf {
    match &self.store {
      Some(path) => crate::expand_tilde(path),
      None => crate::default_store_file(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DiffConfig {
  pub max_char_diff_ratio:       u32,
  pub max_char_diff_total_lines: u32,
  pub max_char_diff_total_chars: usize,
}

impl Default for DiffConfig {
  fn default() -> Self {
    DiffOptions::default().into()
  }
}

impl From<DiffOptions> for DiffConfig {
  fn from(options: DiffOptions) -> Self {
    Self {
      max_char_diff_ratio:       options.max_char_diff_ratio,
      max_char_diff_total_lines: options.max_char_diff_total_lines,
      max_char_diff_total_chars: options.max_char_diff_total_chars,
    }
  }
}

impl From<DiffConfig> for DiffOptions {
  fn from(config: DiffConfig) -> Self {
    Self {
      max_char_diff_ratio:       config.max_char_diff_ratio,
      max_char_diff_total_lines: config.max_char_diff_total_lines,
      max_char_diff_total_chars: config.max_char_diff_total_chars,
    }
  }
}

/// Built-in default config.
pub fn default_config() -> Result<toml::Value> {
  toml::from_str(DEFAULT_CONFIG).context("failed to parse built-in default.toml")
}

/// User config.toml and workspace config, merged onto the default config.
pub fn user_config() -> Result<toml::Value> {
  let default = default_config()?;

  let config = [crate::config_file(), crate::workspace_config_file()]
    .into_iter()
    .filter_map(|file| {
      std::fs::read_to_string(&file).ok().map(|config| {
        log::debug!("loading config from {}", file.display());
        toml::from_str(&config).with_context(|| format!("failed to parse {}", file.display()))
      })
    })
    .collect::<Result<Vec<toml::Value>>>()?
    .into_iter()
    .fold(default, |a, b| crate::merge_toml_values(a, b, 3));

  Ok(config)
}

/// Load the effective configuration.
pub fn load() -> Result<Config> {
  Config::from_toml(user_config()?)
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn default_config_matches_defaults() {
    let config = Config::from_toml(default_config().unwrap()).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(DiffOptions::from(config.diff), DiffOptions::default());
  }

  #[test]
  fn user_values_override_defaults() {
    let user: toml::Value = toml::from_str(
      r#"
        store = "/srv/history.json"
        owner = 42

        [diff]
        max-char-diff-total-lines = 10
        "#,
    )
    .unwrap();
    let merged = crate::merge_toml_values(default_config().unwrap(), user, 3);
    let config = Config::from_toml(merged).unwrap();

    assert_eq!(config.owner, 42);
    assert_eq!(config.store_file(), PathBuf::from("/srv/history.json"));
    assert_eq!(config.diff.max_char_diff_total_lines, 10);
    assert_eq!(config.diff.max_char_diff_ratio, 5);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let value: toml::Value = toml::from_str("ownr = 1\n").unwrap();
    assert!(Config::from_toml(value).is_err());
  }
}
