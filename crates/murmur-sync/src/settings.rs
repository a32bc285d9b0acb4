//! Debounced saving of user settings.
//!
//! Every [`SettingsSaver::schedule`] replaces the pending settings and
//! restarts the quiet period, so a burst of changes results in one save of
//! the last value.

use std::{
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::{Error, Result, transport::Transport};

struct Pending {
  settings: Option<Value>,
  timer:    Option<JoinHandle<()>>,
}

pub struct SettingsSaver<T> {
  transport: Arc<T>,
  delay:     Duration,
  pending:   Arc<Mutex<Pending>>,
}

impl<T: Transport + 'static> SettingsSaver<T> {
  pub fn new(transport: Arc<T>, delay: Duration) -> Self {
    Self {
      transport,
      delay,
      pending: Arc::new(Mutex::new(Pending { settings: None, timer: None })),
    }
  }

  /// Queue `settings` for saving after the quiet period. Must be called from
  /// within a tokio runtime.
  pub fn schedule(&self, settings: Value) {
    let mut pending = self.lock();
    if let Some(timer) = pending.timer.take() {
      timer.abort();
    }
    pending.settings = Some(settings);

    let transport = Arc::clone(&self.transport);
    let shared = Arc::clone(&self.pending);
    let delay = self.delay;
    pending.timer = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      let settings = {
        let mut pending = shared.lock().unwrap_or_else(PoisonError::into_inner);
        pending.timer = None;
        pending.settings.take()
      };
      if let Some(settings) = settings {
        match transport.save_settings(settings).await {
          Ok(()) => tracing::debug!("saved settings"),
          Err(err) => tracing::warn!(%err, "failed to save settings"),
        }
      }
    }));
  }

  pub fn is_pending(&self) -> bool { self.lock().settings.is_some() }

  /// Drop the pending settings without saving them.
  pub fn cancel(&self) {
    let mut pending = self.lock();
    if let Some(timer) = pending.timer.take() {
      timer.abort();
    }
    pending.settings = None;
  }

  /// Save the pending settings now. Returns whether there was anything to
  /// save.
  pub async fn flush(&self) -> Result<bool> {
    let settings = {
      let mut pending = self.lock();
      if let Some(timer) = pending.timer.take() {
        timer.abort();
      }
      pending.settings.take()
    };
    let Some(settings) = settings else {
      return Ok(false);
    };
    self.transport.save_settings(settings).await.map_err(Error::transport)?;
    Ok(true)
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Pending> {
    self.pending.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<T> Drop for SettingsSaver<T> {
  fn drop(&mut self) {
    let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(timer) = pending.timer.take() {
      timer.abort();
    }
  }
}
