use crate::error::ApiError;

/// Event ids are integers; anything else cannot name an event.
pub fn parse_event_id(id: &str) -> Result<i64, ApiError> {
    id.trim().parse::<i64>().map_err(|_| ApiError::NotFound)
}
