//! Persistence Adapters
//!
//! Append-only JSONL storage. The intent journal doubles as the
//! `OrderExecution` implementation when no live venue is wired in.

pub mod journal;

pub use journal::{IntentJournal, JournalRecord};
