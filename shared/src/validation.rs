use serde::{Serialize, Deserialize};
use crate::models::NewEvent;

pub const TITLE_REQUIRED: &str = "Title is required";
pub const EMAIL_REQUIRED: &str = "Email is required";

/// Which set of input rules the server enforces.
///
/// `Legacy` keeps whatever the client sent: empty titles are stored and
/// `A@x.com` and `a@x.com` count as two voters. `Strict` trims input,
/// requires a title and an email, and lower-cases emails before comparing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VotePolicy {
    Legacy,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{TITLE_REQUIRED}")]
    TitleRequired,
    #[error("{EMAIL_REQUIRED}")]
    EmailRequired,
}

pub fn prepare_event(policy: VotePolicy, event: NewEvent) -> Result<NewEvent, ValidationError> {
    match policy {
        VotePolicy::Legacy => Ok(event),
        VotePolicy::Strict => {
            let title = event.title.trim();
            if title.is_empty() { return Err(ValidationError::TitleRequired); }

            Ok(NewEvent {
                title: title.to_string(),
                description: event.description.trim().to_string(),
                date: event.date.trim().to_string(),
            })
        }
    }
}

pub fn normalize_email(policy: VotePolicy, email: &str) -> Result<String, ValidationError> {
    match policy {
        VotePolicy::Legacy => Ok(email.to_string()),
        VotePolicy::Strict => {
            let email = email.trim();
            if email.is_empty() { return Err(ValidationError::EmailRequired); }
            Ok(email.to_lowercase())
        }
    }
}
