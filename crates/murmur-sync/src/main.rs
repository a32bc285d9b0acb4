//! murmur-replay: rebuild a store from a recorded bus log.
//!
//! Reads one JSON bus notification per line, applies each to a fresh store
//! and prints a summary of every thread.
//!
//! ```text
//! murmur-replay bus.jsonl --self-partner 3 --today 2024-05-10
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::Parser;
use murmur_mail::{Handle, Persona, root};
use murmur_sync::{SharedStore, SyncConfig, apply_line, summarize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Replay a murmur bus log into a store")]
struct Cli {
  /// JSON-lines file of bus notifications.
  log: PathBuf,

  /// Path to the TOML configuration file.
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Partner id of the current user.
  #[arg(long)]
  self_partner: Option<i64>,

  /// Date activity states are measured against (YYYY-MM-DD).
  #[arg(long)]
  today: Option<NaiveDate>,

  /// Print summaries as JSON lines.
  #[arg(long)]
  json: bool,

  /// Skip malformed lines instead of stopping at the first one.
  #[arg(long)]
  keep_going: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let config = SyncConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
    )
    .with_writer(std::io::stderr)
    .init();

  let store = SharedStore::new(murmur_mail::store().context("invalid model registry")?);
  store
    .write(|store| {
      if let Some(id) = cli.self_partner {
        let me = Persona::insert(store, serde_json::json!({ "type": "partner", "id": id }))?;
        root::set_self_persona(store, me)?;
      }
      if let Some(today) = cli.today {
        root::set_today(store, today)?;
      }
      Ok(())
    })
    .await
    .context("failed to seed store")?;

  let file = tokio::fs::File::open(&cli.log)
    .await
    .with_context(|| format!("failed to open {}", cli.log.display()))?;
  let mut lines = BufReader::new(file).lines();
  let mut applied = 0usize;
  let mut skipped = 0usize;
  let mut number = 0usize;

  while let Some(line) = lines.next_line().await.context("failed to read log")? {
    number += 1;
    match store.write(|store| apply_line(store, &line)).await {
      Ok(true) => applied += 1,
      Ok(false) => {}
      Err(err) if cli.keep_going => {
        tracing::warn!(line = number, %err, "skipped notification");
        skipped += 1;
      }
      Err(err) => {
        return Err(err).with_context(|| format!("{}:{number}", cli.log.display()));
      }
    }
  }
  tracing::info!(applied, skipped, revision = store.revision(), "replay finished");

  let summaries = store.read(summarize).await.context("failed to summarise store")?;
  for summary in summaries {
    if cli.json {
      println!("{}", serde_json::to_string(&summary)?);
    } else {
      println!("{summary}");
    }
  }

  Ok(())
}
