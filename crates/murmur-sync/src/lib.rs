//! Services that keep a murmur store in sync with the server.
//!
//! The store itself is synchronous; this crate wraps it in a [`SharedStore`]
//! and drives it from async services talking to a [`Transport`].

pub mod bus;
pub mod config;
pub mod error;
pub mod loader;
pub mod poster;
pub mod settings;
pub mod shared;
pub mod summary;
pub mod transport;

pub use bus::{BusNotification, apply_line};
pub use config::SyncConfig;
pub use error::{Error, Result};
pub use loader::{LoadOutcome, ThreadLoader};
pub use poster::MessagePoster;
pub use settings::SettingsSaver;
pub use shared::SharedStore;
pub use summary::{ThreadSummary, summarize};
pub use transport::{PostData, ThreadRef, Transport};
