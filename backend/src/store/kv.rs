//! Append-only key-value log.
//!
//! Each line of the log is one `{"key": "<id>", "value": {...}}` record and
//! the last record written for a key wins. The whole map lives in memory;
//! writers are serialized by a mutex and append a single line per change.

use std::path::{Path, PathBuf};

use rocket::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::{Event, NewEvent, VoteOutcome};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{next_id, EventMap, EventRecord, EventStore, StoreError};

pub const FILE_NAME: &str = "events.kv";

#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    key: String,
    value: EventRecord,
}

pub struct KvStore {
    path: PathBuf,
    events: Mutex<EventMap>,
}

impl KvStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let Replay { events, superseded, torn } = replay(&path).await?;

        if superseded > 0 || torn {
            info!("🧹 Compacting {} superseded records in {}", superseded, path.display());
            compact(&path, &events).await?;
        }

        debug!("Loaded {} events from {}", events.len(), path.display());
        Ok(Self { path, events: Mutex::new(events) })
    }

    /// Reads the log without compacting or repairing it.
    pub async fn read(path: &Path) -> Result<Vec<Event>, StoreError> {
        let Replay { events, .. } = replay(path).await?;
        Ok(events.iter().map(|(id, record)| record.to_event(*id)).collect())
    }

    async fn append(&self, id: i64, record: &EventRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(&LogEntry { key: id.to_string(), value: record.clone() })?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.sync_data().await?;
        Ok(())
    }
}

struct Replay {
    events: EventMap,
    superseded: usize,
    /// The final record was cut short by an interrupted append.
    torn: bool,
}

async fn replay(path: &Path) -> Result<Replay, StoreError> {
    let mut replay = Replay { events: EventMap::new(), superseded: 0, torn: false };

    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(replay),
        Err(e) => return Err(e.into()),
    };
    let contents = String::from_utf8_lossy(&bytes);

    let lines: Vec<(usize, &str)> = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    for (position, &(number, line)) in lines.iter().enumerate() {
        let entry: LogEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(e) if position + 1 == lines.len() => {
                warn!("Dropping unreadable final record on line {} of {}: {}", number + 1, path.display(), e);
                replay.torn = true;
                break;
            }
            Err(e) => return Err(e.into()),
        };
        let id = entry.key.parse::<i64>().map_err(|_| {
            StoreError::Corrupt(format!("line {}: key {:?} is not an event id", number + 1, entry.key))
        })?;
        if replay.events.insert(id, entry.value).is_some() {
            replay.superseded += 1;
        }
    }

    Ok(replay)
}

async fn compact(path: &Path, events: &EventMap) -> Result<(), StoreError> {
    let mut buffer = Vec::new();
    for (id, record) in events {
        serde_json::to_writer(&mut buffer, &LogEntry { key: id.to_string(), value: record.clone() })?;
        buffer.push(b'\n');
    }

    let tmp = path.with_extension("kv.tmp");
    fs::write(&tmp, &buffer).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl EventStore for KvStore {
    #[instrument(skip(self, event), fields(title = %event.title))]
    async fn insert_event(&self, event: &NewEvent) -> Result<Event, StoreError> {
        let mut events = self.events.lock().await;
        let id = next_id(&events);
        let record = EventRecord::from_new(event);

        self.append(id, &record).await?;
        events.insert(id, record.clone());
        debug!("Stored event {}", id);
        Ok(record.to_event(id))
    }

    #[instrument(skip(self, email))]
    async fn record_vote(&self, event_id: i64, email: &str) -> Result<VoteOutcome, StoreError> {
        let mut events = self.events.lock().await;
        let record = events.get(&event_id).ok_or(StoreError::NotFound(event_id))?;

        let mut updated = record.clone();
        let outcome = updated.add_vote(email);
        if outcome.is_recorded() {
            self.append(event_id, &updated).await?;
            events.insert(event_id, updated);
        }
        Ok(outcome)
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let events = self.events.lock().await;
        Ok(events.iter().map(|(id, record)| record.to_event(*id)).collect())
    }
}
