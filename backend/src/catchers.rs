use rocket::{Request, catch, serde::json::Json};
use shared::ErrorResponse;

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new("Invalid request parameters."))
}

#[catch(404)]
pub fn not_found(req: &Request) -> Json<ErrorResponse> {
    match req.uri().path().segments().next() {
        Some("vote") => Json(ErrorResponse::new("Event not found")),
        _ => Json(ErrorResponse::new("The requested resource was not found.")),
    }
}

#[catch(413)]
pub fn payload_too_large(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new("Request body is too large."))
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new("The request body could not be understood."))
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new("An internal server error occurred."))
}
