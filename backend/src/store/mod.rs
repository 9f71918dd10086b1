//! Persistence adapters.
//!
//! Three interchangeable stores sit behind [`EventStore`]: an append-only
//! key-value log, a single JSON document with a SQLite mirror, and a
//! relational schema. Exactly one is opened per process.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::models::{Event, NewEvent, VoteOutcome};
use thiserror::Error;
use tracing::info;

use crate::config::{AppConfig, StorageKind};

pub mod document;
pub mod kv;
pub mod relational;

pub use document::DocumentStore;
pub use kv::KvStore;
pub use relational::RelationalStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Event {0} not found")]
    NotFound(i64),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Corrupt store: {0}")]
    Corrupt(String),
}

#[rocket::async_trait]
pub trait EventStore: Send + Sync {
    /// Persists a new event with no votes and returns it with its id.
    async fn insert_event(&self, event: &NewEvent) -> Result<Event, StoreError>;

    /// Records `email` against the event unless it already voted.
    async fn record_vote(&self, event_id: i64, email: &str) -> Result<VoteOutcome, StoreError>;

    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    /// The JSON document served by `/download-json`, if this store keeps one.
    fn snapshot_path(&self) -> Option<&Path> {
        None
    }

    /// The SQLite mirror served by `/download-db`, if this store keeps one.
    fn mirror_path(&self) -> Option<&Path> {
        None
    }

    async fn close(&self) {}
}

/// On-disk shape of one event in the file-backed stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub votes: Vec<String>,
}

impl EventRecord {
    pub fn from_new(event: &NewEvent) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date.clone(),
            votes: Vec::new(),
        }
    }

    pub fn to_event(&self, id: i64) -> Event {
        Event {
            id,
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date.clone(),
            created_at: None,
            votes: self.votes.clone(),
        }
    }

    /// Appends `email` unless it already voted for this event.
    pub fn add_vote(&mut self, email: &str) -> VoteOutcome {
        if self.votes.iter().any(|v| v == email) {
            return VoteOutcome::AlreadyVoted { votes: self.votes.len() };
        }
        self.votes.push(email.to_string());
        VoteOutcome::Recorded { votes: self.votes.len() }
    }
}

/// Events keyed by id. serde_json writes the integer keys as strings.
pub type EventMap = BTreeMap<i64, EventRecord>;

/// Ids in the file stores are count-based: the next id is `len + 1`.
pub fn next_id(events: &EventMap) -> i64 {
    events.len() as i64 + 1
}

pub async fn open(config: &AppConfig) -> Result<Arc<dyn EventStore>, StoreError> {
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let store: Arc<dyn EventStore> = match config.storage {
        StorageKind::Kv => Arc::new(KvStore::open(config.data_dir.join(kv::FILE_NAME)).await?),
        StorageKind::Json => Arc::new(
            DocumentStore::open(
                config.data_dir.join(document::FILE_NAME),
                config.data_dir.join(document::MIRROR_FILE_NAME),
            )
            .await?,
        ),
        StorageKind::Sql => Arc::new(RelationalStore::connect(&config.database_url).await?),
    };

    info!("📦 Opened {:?} event store", config.storage);
    Ok(store)
}

/// Lists the configured store's events without opening it for writing.
///
/// Nothing is created, compacted, migrated or mirrored, so this is safe to
/// run against the data directory of a live server.
pub async fn read_events(config: &AppConfig) -> Result<Vec<Event>, StoreError> {
    match config.storage {
        StorageKind::Kv => KvStore::read(&config.data_dir.join(kv::FILE_NAME)).await,
        StorageKind::Json => DocumentStore::read(&config.data_dir.join(document::FILE_NAME)).await,
        StorageKind::Sql => {
            let store = RelationalStore::connect_read_only(&config.database_url).await?;
            let events = store.list_events().await;
            store.close().await;
            events
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_events_leaves_data_dir_alone() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            storage: StorageKind::Json,
            data_dir: dir.path().join("data"),
            ..AppConfig::default()
        };

        assert!(read_events(&config).await.unwrap().is_empty());
        assert!(!config.data_dir.exists());

        let store = open(&config).await.unwrap();
        let event = NewEvent { title: "Offsite".into(), ..NewEvent::default() };
        store.insert_event(&event).await.unwrap();
        store.close().await;

        let events = read_events(&config).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Offsite");
    }
}
