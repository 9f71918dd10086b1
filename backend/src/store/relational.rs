use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use rocket::async_trait;
use shared::models::{Event, NewEvent, VoteOutcome};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use super::{EventStore, StoreError};

/// Events and votes in SQLite. One vote per (event, email) is enforced by the
/// `unique_voter` constraint, not by a lookup before the insert.
pub struct RelationalStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct EventRow {
    id: i64,
    title: String,
    description: Option<String>,
    date: Option<String>,
    created_at: OffsetDateTime,
}

impl RelationalStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // An in-memory database lives and dies with its single connection.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal))
                .await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("📋 Migrations complete");

        Ok(Self { pool })
    }

    /// Opens an existing database without creating it or running migrations.
    pub async fn connect_read_only(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    async fn count_votes<'e, E>(executor: E, event_id: i64) -> Result<usize, StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE event_id = ?1")
            .bind(event_id)
            .fetch_one(executor)
            .await?;
        Ok(count as usize)
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(e) if e.is_unique_violation())
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(e) if e.is_foreign_key_violation())
}

#[async_trait]
impl EventStore for RelationalStore {
    #[instrument(skip(self, event), fields(title = %event.title))]
    async fn insert_event(&self, event: &NewEvent) -> Result<Event, StoreError> {
        let created_at = OffsetDateTime::now_utc();

        let id = sqlx::query(
            "INSERT INTO events (title, description, date, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.date)
        .bind(created_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!("Stored event {}", id);
        Ok(Event {
            id,
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date.clone(),
            created_at: Some(created_at),
            votes: Vec::new(),
        })
    }

    #[instrument(skip(self, email))]
    async fn record_vote(&self, event_id: i64, email: &str) -> Result<VoteOutcome, StoreError> {
        // The insert comes first so the transaction asks for the write lock
        // before reading anything; the foreign key stands in for the lookup.
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT INTO votes (event_id, email, created_at) VALUES (?1, ?2, ?3)")
            .bind(event_id)
            .bind(email)
            .bind(OffsetDateTime::now_utc())
            .execute(&mut *tx)
            .await;

        match inserted {
            Ok(_) => {
                let votes = Self::count_votes(&mut *tx, event_id).await?;
                tx.commit().await?;
                Ok(VoteOutcome::Recorded { votes })
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                debug!("Duplicate vote for event {}", event_id);
                let votes = Self::count_votes(&self.pool, event_id).await?;
                Ok(VoteOutcome::AlreadyVoted { votes })
            }
            Err(e) if is_foreign_key_violation(&e) => {
                tx.rollback().await?;
                Err(StoreError::NotFound(event_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT id, title, description, date, created_at FROM events
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let voters: Vec<(i64, String)> = sqlx::query_as("SELECT event_id, email FROM votes ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut by_event: HashMap<i64, Vec<String>> = HashMap::new();
        for (event_id, email) in voters {
            by_event.entry(event_id).or_default().push(email);
        }

        Ok(rows
            .into_iter()
            .map(|row| Event {
                votes: by_event.remove(&row.id).unwrap_or_default(),
                id: row.id,
                title: row.title,
                description: row.description.unwrap_or_default(),
                date: row.date.unwrap_or_default(),
                created_at: Some(row.created_at),
            })
            .collect())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
