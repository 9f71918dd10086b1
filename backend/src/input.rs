use rocket::data::{self, Data, FromData, Limits};
use rocket::form::{Form, FromForm};
use rocket::http::{RawStr, Status};
use rocket::outcome::Outcome;
use rocket::Request;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// A request body accepted either as JSON or as an url-encoded form.
///
/// The content type is inspected once here; handlers only ever see the
/// parsed `body` and whether the client asked for a JSON reply.
#[derive(Debug)]
pub struct Submission<T> {
    pub body: T,
    pub wants_json: bool,
}

fn is_json_body(req: &Request<'_>) -> bool {
    req.content_type().map_or(false, |ct| ct.is_json())
}

/// JSON bodies, XHR requests and clients preferring JSON get JSON back.
pub fn wants_json(req: &Request<'_>) -> bool {
    let xhr = req
        .headers()
        .get_one("X-Requested-With")
        .map_or(false, |v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    let accepts_json = req.accept().map_or(false, |accept| accept.preferred().media_type().is_json());

    is_json_body(req) || xhr || accepts_json
}

#[rocket::async_trait]
impl<'r, T> FromData<'r> for Submission<T>
where
    T: DeserializeOwned + for<'a> FromForm<'a> + Send + 'static,
{
    type Error = ApiError;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        let json = is_json_body(req);
        let limit = if json {
            req.limits().get("json").unwrap_or(Limits::JSON)
        } else {
            req.limits().get("form").unwrap_or(Limits::FORM)
        };

        let body = match data.open(limit).into_string().await {
            Ok(body) if body.is_complete() => body.into_inner(),
            Ok(_) => {
                let error = ApiError::BadRequest(format!("body exceeds {}", limit));
                return Outcome::Error((Status::PayloadTooLarge, error));
            }
            Err(e) => return Outcome::Error((Status::BadRequest, ApiError::BadRequest(e.to_string()))),
        };

        let parsed = if json {
            serde_json::from_str::<T>(&body).map_err(|e| e.to_string())
        } else {
            Form::<T>::parse_encoded(RawStr::new(&body)).map_err(|e| e.to_string())
        };

        match parsed {
            Ok(body) => Outcome::Success(Submission { body, wants_json: wants_json(req) }),
            Err(e) => {
                debug!("Rejected {} body: {}", if json { "JSON" } else { "form" }, e);
                Outcome::Error((Status::BadRequest, ApiError::BadRequest(e)))
            }
        }
    }
}
