use anyhow::Result;
use channel_search::build_rocket;
use channel_search::config::{create_app_state, create_cors, init_logger, load_environment, Config};
use log::info;

#[rocket::main]
async fn main() -> Result<()> {
    load_environment();
    init_logger();

    let config = Config::from_env()?;
    let state = create_app_state(&config).await?;
    let cors = create_cors(&config.cors_allowed_origins)?;

    info!(
        "Storage: {}, listing cap: {:?}, fetch concurrency: {}",
        config.storage_url, config.max_videos, config.fetch_concurrency
    );

    build_rocket(state, cors)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket failed to launch: {e}"))?;

    Ok(())
}
