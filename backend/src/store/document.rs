//! Single JSON document with a denormalized SQLite mirror.
//!
//! The document is rewritten in full on every change: serialized to a
//! temporary file, synced, then renamed over the previous copy so readers
//! never see a partial write. The mirror is rebuilt from the document after
//! each write and only exists to be downloaded.

use std::path::{Path, PathBuf};

use rocket::async_trait;
use shared::models::{Event, NewEvent, VoteOutcome};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::{next_id, EventMap, EventRecord, EventStore, StoreError};

pub const FILE_NAME: &str = "events.json";
pub const MIRROR_FILE_NAME: &str = "events_mirror.sqlite";

pub struct DocumentStore {
    path: PathBuf,
    mirror_path: PathBuf,
    mirror: SqlitePool,
    writer: Mutex<()>,
}

impl DocumentStore {
    pub async fn open(path: impl Into<PathBuf>, mirror_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mirror_path = mirror_path.into();

        // The mirror is downloaded as a single file, so no WAL sidecar.
        let options = SqliteConnectOptions::new()
            .filename(&mirror_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete);

        let mirror = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                vote_count INTEGER NOT NULL,
                voters TEXT NOT NULL
            )
            "#,
        )
        .execute(&mirror)
        .await?;

        let store = Self { path, mirror_path, mirror, writer: Mutex::new(()) };

        let events = store.load().await?;
        store.save(&events).await?;
        debug!("Loaded {} events from {}", events.len(), store.path.display());

        Ok(store)
    }

    /// Reads the document without creating it or touching the mirror.
    pub async fn read(path: &Path) -> Result<Vec<Event>, StoreError> {
        let events = load(path).await?;
        Ok(events.iter().map(|(id, record)| record.to_event(*id)).collect())
    }

    async fn load(&self) -> Result<EventMap, StoreError> {
        load(&self.path).await
    }

    async fn save(&self, events: &EventMap) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(events)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &self.path).await?;

        self.rebuild_mirror(events).await
    }

    async fn rebuild_mirror(&self, events: &EventMap) -> Result<(), StoreError> {
        let mut tx = self.mirror.begin().await?;

        sqlx::query("DELETE FROM events").execute(&mut *tx).await?;

        for (id, record) in events {
            sqlx::query(
                "INSERT INTO events (id, title, description, date, vote_count, voters)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(*id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.date)
            .bind(record.votes.len() as i64)
            .bind(serde_json::to_string(&record.votes)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn load(path: &Path) -> Result<EventMap, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EventMap::new()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl EventStore for DocumentStore {
    #[instrument(skip(self, event), fields(title = %event.title))]
    async fn insert_event(&self, event: &NewEvent) -> Result<Event, StoreError> {
        let _guard = self.writer.lock().await;
        let mut events = self.load().await?;

        let id = next_id(&events);
        let record = EventRecord::from_new(event);
        events.insert(id, record.clone());

        self.save(&events).await?;
        debug!("Stored event {}", id);
        Ok(record.to_event(id))
    }

    #[instrument(skip(self, email))]
    async fn record_vote(&self, event_id: i64, email: &str) -> Result<VoteOutcome, StoreError> {
        let _guard = self.writer.lock().await;
        let mut events = self.load().await?;

        let record = events.get_mut(&event_id).ok_or(StoreError::NotFound(event_id))?;
        let outcome = record.add_vote(email);
        if outcome.is_recorded() {
            self.save(&events).await?;
        }
        Ok(outcome)
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let events = self.load().await?;
        Ok(events.iter().map(|(id, record)| record.to_event(*id)).collect())
    }

    fn snapshot_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn mirror_path(&self) -> Option<&Path> {
        Some(&self.mirror_path)
    }

    async fn close(&self) {
        self.mirror.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> DocumentStore {
        DocumentStore::open(dir.path().join(FILE_NAME), dir.path().join(MIRROR_FILE_NAME))
            .await
            .unwrap()
    }

    fn event(title: &str) -> NewEvent {
        NewEvent { title: title.into(), description: String::new(), date: "2024-09-01".into() }
    }

    #[tokio::test]
    async fn test_open_writes_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let contents = std::fs::read_to_string(store.snapshot_path().unwrap()).unwrap();
        assert_eq!(contents.trim(), "{}");
        assert!(store.mirror_path().unwrap().exists());
    }

    #[tokio::test]
    async fn test_document_layout_keys_by_string_id() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        store.insert_event(&event("Offsite")).await.unwrap();
        store.record_vote(1, "A@x.com").await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(FILE_NAME)).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "1": {"title": "Offsite", "description": "", "date": "2024-09-01", "votes": ["A@x.com"]}
            })
        );
        assert!(!dir.path().join("events.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_ids_follow_numeric_order() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        for n in 1..=11 {
            store.insert_event(&event(&format!("Event {n}"))).await.unwrap();
        }

        let ids: Vec<i64> = store.list_events().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, (1..=11).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_mirror_tracks_document() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        store.insert_event(&event("Offsite")).await.unwrap();
        store.insert_event(&event("Retro")).await.unwrap();
        store.record_vote(2, "a@x.com").await.unwrap();
        store.record_vote(2, "b@x.com").await.unwrap();
        store.record_vote(2, "a@x.com").await.unwrap();

        let rows: Vec<(i64, String, i64, String)> =
            sqlx::query_as("SELECT id, title, vote_count, voters FROM events ORDER BY id")
                .fetch_all(&store.mirror)
                .await
                .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], (2, "Retro".to_string(), 2, r#"["a@x.com","b@x.com"]"#.to_string()));
    }

    #[tokio::test]
    async fn test_read_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        assert!(DocumentStore::read(&path).await.unwrap().is_empty());
        assert!(!path.exists());
        assert!(!dir.path().join(MIRROR_FILE_NAME).exists());

        let store = open_store(&dir).await;
        store.insert_event(&event("Offsite")).await.unwrap();
        store.close().await;

        let events = DocumentStore::read(&path).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Offsite");
    }

    #[tokio::test]
    async fn test_reopen_keeps_events() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir).await;
            store.insert_event(&event("Offsite")).await.unwrap();
            store.close().await;
        }

        let store = open_store(&dir).await;
        assert_eq!(store.list_events().await.unwrap().len(), 1);
        assert!(matches!(store.record_vote(5, "a@x.com").await, Err(StoreError::NotFound(5))));
    }
}
