use serde::{Serialize, Deserialize};
use time::OffsetDateTime;

/// An event together with the emails that voted for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    pub votes: Vec<String>,
}

/// What `/events` hands out: the vote count, never the voters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: String,
    pub votes: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "backend", derive(rocket::FromForm))]
#[serde(default)]
pub struct NewEvent {
    #[cfg_attr(feature = "backend", field(default = String::new()))]
    pub title: String,
    #[cfg_attr(feature = "backend", field(default = String::new()))]
    pub description: String,
    #[cfg_attr(feature = "backend", field(default = String::new()))]
    pub date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "backend", derive(rocket::FromForm))]
#[serde(default)]
pub struct VoteRequest {
    #[cfg_attr(feature = "backend", field(default = String::new()))]
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded { votes: usize },
    AlreadyVoted { votes: usize },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    Ok,
    AlreadyVoted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteResponse {
    pub status: VoteStatus,
    pub votes: usize,
}

impl Event {
    pub fn total_votes(&self) -> usize {
        self.votes.len()
    }

    pub fn has_voted(&self, email: &str) -> bool {
        self.votes.iter().any(|v| v == email)
    }

    pub fn summary(&self) -> EventSummary {
        EventSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date.clone(),
            votes: self.total_votes(),
        }
    }
}

impl VoteOutcome {
    pub fn votes(&self) -> usize {
        match *self {
            VoteOutcome::Recorded { votes } | VoteOutcome::AlreadyVoted { votes } => votes,
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, VoteOutcome::Recorded { .. })
    }
}

impl From<VoteOutcome> for VoteResponse {
    fn from(outcome: VoteOutcome) -> Self {
        let status = match outcome {
            VoteOutcome::Recorded { .. } => VoteStatus::Ok,
            VoteOutcome::AlreadyVoted { .. } => VoteStatus::AlreadyVoted,
        };
        VoteResponse { status, votes: outcome.votes() }
    }
}
