use std::path::Path;
use std::sync::Arc;

use shared::models::*;
use shared::validation::{normalize_email, prepare_event, VotePolicy};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::store::EventStore;

/// Applies the input rules in force and hands the result to the store.
pub struct EventProcessor {
    store: Arc<dyn EventStore>,
    policy: VotePolicy,
}

impl EventProcessor {
    pub fn new(store: Arc<dyn EventStore>, policy: VotePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> VotePolicy {
        self.policy
    }

    #[instrument(skip(self, request))]
    pub async fn create_event(&self, request: NewEvent) -> Result<EventSummary, ApiError> {
        let event = prepare_event(self.policy, request)?;
        let created = self.store.insert_event(&event).await?;
        info!("✓ Created event {}", created.id);
        Ok(created.summary())
    }

    #[instrument(skip(self, request))]
    pub async fn cast_vote(&self, event_id: i64, request: VoteRequest) -> Result<VoteOutcome, ApiError> {
        let email = normalize_email(self.policy, &request.email)?;
        let outcome = self.store.record_vote(event_id, &email).await?;
        match outcome {
            VoteOutcome::Recorded { votes } => info!("✓ Vote recorded for event {} ({} total)", event_id, votes),
            VoteOutcome::AlreadyVoted { .. } => info!("Voter already counted for event {}", event_id),
        }
        Ok(outcome)
    }

    pub async fn list_events(&self) -> Result<Vec<Event>, ApiError> {
        Ok(self.store.list_events().await?)
    }

    pub async fn list_summaries(&self) -> Result<Vec<EventSummary>, ApiError> {
        let events = self.list_events().await?;
        Ok(events.iter().map(Event::summary).collect())
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.store.snapshot_path()
    }

    pub fn mirror_path(&self) -> Option<&Path> {
        self.store.mirror_path()
    }

    pub async fn shutdown(&self) {
        self.store.close().await;
        info!("📦 Event store closed");
    }
}
