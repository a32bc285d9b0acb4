//! Error types for `murmur-sync`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[from] murmur_core::Error),

  #[error("transport error: {0}")]
  Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("malformed bus notification: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("cannot post an empty message")]
  EmptyMessage,
}

impl Error {
  pub(crate) fn transport<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Transport(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
