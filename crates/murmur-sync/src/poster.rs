//! Posting messages and applying the server's echo.

use std::sync::Arc;

use murmur_mail::{Handle, Message, Thread};

use crate::{
  Error, Result,
  shared::SharedStore,
  transport::{PostData, ThreadRef, Transport},
};

pub struct MessagePoster<T> {
  transport: Arc<T>,
  store:     SharedStore,
}

impl<T: Transport> MessagePoster<T> {
  pub fn new(transport: Arc<T>, store: SharedStore) -> Self { Self { transport, store } }

  /// Post `data` to `thread`. The message only enters the store once the
  /// server has accepted it.
  pub async fn post(&self, thread: &ThreadRef, data: PostData) -> Result<Message> {
    if data.body.trim().is_empty() && data.attachment_ids.is_empty() {
      return Err(Error::EmptyMessage);
    }
    let echo = self
      .transport
      .post_message(thread, data)
      .await
      .map_err(Error::transport)?;

    let key = thread.key();
    let message = self
      .store
      .write(|store| {
        let target = Thread::insert(store, key)?;
        Ok(target.receive_message(store, echo)?)
      })
      .await?;
    tracing::info!(?thread, message = %message.record(), "posted message");
    Ok(message)
  }
}
