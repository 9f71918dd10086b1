use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{validation::ValidationError, ErrorResponse};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Event not found")]
    NotFound,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::NotFound => Status::NotFound,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let message = match self {
            ApiError::Internal(details) => {
                error!("{} {} failed: {}", req.method(), req.uri(), details);
                "An internal server error occurred.".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(message))).respond_to(req)
    }
}
