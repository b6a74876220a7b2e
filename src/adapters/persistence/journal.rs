//! Intent Journal - Append-only JSONL Order Intents
//!
//! Stands in for the execution collaborator: every submitted intent is
//! appended to a daily file `intents/YYYY-MM-DD.jsonl`, one
//! self-contained JSON record per line. A downstream executor can tail
//! the file; replays read it back with `load_all`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::domain::trade::OrderIntent;
use crate::ports::execution::{OrderExecution, SubmissionReport};

/// One journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
  /// When the intent was written.
  pub recorded_at: DateTime<Utc>,
  /// Venue order id assigned by the journal.
  pub venue_order_id: String,
  /// The intent itself.
  pub intent: OrderIntent,
}

/// Append-only JSONL intent journal with daily file rotation.
pub struct IntentJournal {
  /// Directory holding the daily files.
  intents_dir: PathBuf,
  /// Serializes appends so lines never interleave.
  write_lock: Mutex<()>,
}

impl IntentJournal {
  /// Create a journal under `data_dir/intents`.
  pub async fn new(data_dir: &str) -> Result<Self> {
    let intents_dir = Path::new(data_dir).join("intents");
    fs::create_dir_all(&intents_dir)
      .await
      .context("Failed to create intents directory")?;
    Ok(Self {
      intents_dir,
      write_lock: Mutex::new(()),
    })
  }

  /// Append one record to today's file.
  #[instrument(skip(self, record), fields(intent_id = %record.intent.id))]
  pub async fn append(&self, record: &JournalRecord) -> Result<()> {
    let date = record.recorded_at.format("%Y-%m-%d").to_string();
    let path = self.intents_dir.join(format!("{date}.jsonl"));

    let mut json = serde_json::to_string(record).context("Failed to serialize intent record")?;
    json.push('\n');

    let _guard = self.write_lock.lock().await;
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&path)
      .await
      .context("Failed to open intent journal")?;

    file
      .write_all(json.as_bytes())
      .await
      .context("Failed to write intent record")?;
    file.flush().await.context("Failed to flush intent journal")?;

    Ok(())
  }

  /// Load every record from every daily file, oldest first.
  #[instrument(skip(self))]
  pub async fn load_all(&self) -> Result<Vec<JournalRecord>> {
    let mut records = Vec::new();
    let mut entries = fs::read_dir(&self.intents_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().is_some_and(|ext| ext == "jsonl") {
        let content = fs::read_to_string(&path).await?;
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
          match serde_json::from_str::<JournalRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
              file = %path.display(),
              error = %e,
              "Skipping malformed intent record"
            ),
          }
        }
      }
    }

    records.sort_by_key(|r| r.recorded_at);
    info!(count = records.len(), "Loaded intent records");
    Ok(records)
  }
}

#[async_trait]
impl OrderExecution for IntentJournal {
  async fn submit(&self, intent: &OrderIntent) -> Result<SubmissionReport> {
    let venue_order_id = format!("journal-{}", intent.id);
    let record = JournalRecord {
      recorded_at: Utc::now(),
      venue_order_id: venue_order_id.clone(),
      intent: intent.clone(),
    };
    self.append(&record).await?;
    Ok(SubmissionReport::accepted(venue_order_id))
  }
}
