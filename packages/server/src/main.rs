#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone binary for the wildfire risk API server.

#[actix_web::main]
async fn main() -> Result<(), terra_insight_server::ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    terra_insight_server::run_from_env().await
}
