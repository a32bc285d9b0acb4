//! Runtime configuration of the sync services.

use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::Result;

/// Settings for the sync services, read from an optional TOML file and
/// overridden by `MURMUR_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Messages requested per history page.
  pub page_size:            usize,
  /// Quiet period before pending settings are saved.
  pub settings_debounce_ms: u64,
  /// Default `tracing` filter when `RUST_LOG` is unset.
  pub log_filter:           String,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      page_size:            30,
      settings_debounce_ms: 500,
      log_filter:           "info".to_owned(),
    }
  }
}

impl SyncConfig {
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
      builder = builder.add_source(config::File::from(path).required(false));
    }
    let settings = builder
      .add_source(config::Environment::with_prefix("MURMUR").try_parsing(true))
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  pub fn settings_debounce(&self) -> Duration {
    Duration::from_millis(self.settings_debounce_ms)
  }
}
