#[macro_use]
extern crate rocket;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use rocket::{Build, Rocket};
use services::channel_resolver::ChannelResolver;
use services::pipeline::SearchPipeline;

pub struct AppState {
    pub resolver: ChannelResolver,
    pub pipeline: SearchPipeline,
}

/// Mounts every route on a fresh Rocket instance.
pub fn build_rocket(state: AppState, cors: rocket_cors::Cors) -> Rocket<Build> {
    rocket::build()
        .manage(state)
        .mount(
            "/",
            routes![
                api::channel::find_channel_id,
                api::search::search,
                api::health::health
            ],
        )
        .register("/", catchers![api::health::json_error])
        .attach(cors)
}
