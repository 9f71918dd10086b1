use std::path::PathBuf;
use std::sync::Arc;

use rocket::fs::NamedFile;
use rocket::http::{ContentType, Status};
use rocket::response::{self, content::RawHtml, Redirect, Responder};
use rocket::serde::json::Json;
use rocket::{get, post, Request, State};
use serde::Serialize;
use shared::models::*;
use shared::validation::VotePolicy;
use tracing::{debug, instrument};

use crate::{
    error::ApiError,
    input::Submission,
    pages,
    processor::EventProcessor,
    store::EventStore,
    utils::parse_event_id,
};

pub struct AppState {
    pub processor: EventProcessor,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>, policy: VotePolicy) -> Self {
        Self {
            processor: EventProcessor::new(store, policy),
        }
    }
}

/// JSON for clients that asked for it, a redirect home for plain forms.
pub enum Reply<T> {
    Json(Status, T),
    Redirect(Redirect),
}

impl<T> Reply<T> {
    fn new(wants_json: bool, status: Status, body: T) -> Self {
        if wants_json {
            Reply::Json(status, body)
        } else {
            Reply::Redirect(Redirect::to("/"))
        }
    }
}

impl<'r, 'o: 'r, T: Serialize> Responder<'r, 'o> for Reply<T> {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        match self {
            Reply::Json(status, body) => (status, Json(body)).respond_to(req),
            Reply::Redirect(redirect) => redirect.respond_to(req),
        }
    }
}

#[get("/")]
pub async fn index(state: &State<AppState>) -> Result<RawHtml<String>, ApiError> {
    let processor = &state.processor;
    let page = match processor.policy() {
        VotePolicy::Legacy => {
            let events = processor.list_events().await?;
            pages::render_index(Some(events.as_slice()))
        }
        VotePolicy::Strict => pages::render_index(None),
    };
    Ok(RawHtml(page))
}

#[get("/static/<path..>")]
pub fn static_asset(path: PathBuf) -> Option<(ContentType, &'static [u8])> {
    let name = path.to_str()?;
    let content_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ContentType::from_extension)
        .unwrap_or(ContentType::Binary);
    pages::asset(name).map(|bytes| (content_type, bytes))
}

#[get("/events")]
pub async fn list_events(state: &State<AppState>) -> Result<Json<Vec<EventSummary>>, ApiError> {
    state.processor.list_summaries().await.map(Json)
}

#[instrument(skip(state, submission))]
#[post("/add_event", data = "<submission>")]
pub async fn add_event(
    state: &State<AppState>,
    submission: Submission<NewEvent>,
) -> Result<Reply<EventSummary>, ApiError> {
    let Submission { body, wants_json } = submission;
    let created = state.processor.create_event(body).await?;
    Ok(Reply::new(wants_json, Status::Created, created))
}

#[instrument(skip(state, submission), fields(event_id = %id))]
#[post("/vote/<id>", data = "<submission>")]
pub async fn vote(
    state: &State<AppState>,
    id: &str,
    submission: Submission<VoteRequest>,
) -> Result<Reply<VoteResponse>, ApiError> {
    let event_id = parse_event_id(id)?;
    let Submission { body, wants_json } = submission;

    let outcome = state.processor.cast_vote(event_id, body).await?;
    let status = if outcome.is_recorded() { Status::Created } else { Status::Ok };
    Ok(Reply::new(wants_json, status, VoteResponse::from(outcome)))
}

#[get("/ping")]
pub fn ping() -> &'static str {
    "pong"
}

#[get("/download-json")]
pub async fn download_json(state: &State<AppState>) -> Option<NamedFile> {
    let path = state.processor.snapshot_path()?;
    debug!("Serving event document {}", path.display());
    NamedFile::open(path).await.ok()
}

#[get("/download-db")]
pub async fn download_db(state: &State<AppState>) -> Option<NamedFile> {
    let path = state.processor.mirror_path()?;
    debug!("Serving event mirror {}", path.display());
    NamedFile::open(path).await.ok()
}
