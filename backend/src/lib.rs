pub mod catchers;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod pages;
pub mod processor;
pub mod routes;
pub mod store;
pub mod utils;
pub use shared::{models::*, validation::*, ErrorResponse};

use rocket::fairing::AdHoc;
use rocket::{catchers, routes, Build, Rocket};

use crate::catchers::{bad_request, internal_error, not_found, payload_too_large, unprocessable};
use crate::routes::{
    add_event, download_db, download_json, index, list_events, ping, static_asset, vote, AppState,
};

/// Mounts every route on `rocket` and ties the store's lifetime to it.
pub fn build_rocket(rocket: Rocket<Build>, state: AppState) -> Rocket<Build> {
    rocket
        .manage(state)
        .attach(AdHoc::on_shutdown("Close event store", |rocket| {
            Box::pin(async move {
                if let Some(state) = rocket.state::<AppState>() {
                    state.processor.shutdown().await;
                }
            })
        }))
        .mount(
            "/",
            routes![
                index,
                static_asset,
                list_events,
                add_event,
                vote,
                ping,
                download_json,
                download_db
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                not_found,
                payload_too_large,
                unprocessable,
                internal_error
            ],
        )
}
