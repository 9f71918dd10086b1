use event_vote::{build_rocket, config::AppConfig, logging::init_tracing, routes::AppState, store};
use tracing::{error, info};

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let figment = rocket::Config::figment();
    let config = AppConfig::from_figment(&figment)?;
    let policy = config.policy();
    info!("🚀 Starting event vote server ({:?} storage, {:?} rules)", config.storage, policy);

    let store = store::open(&config).await.map_err(|e| {
        error!("Failed to open event store: {}", e);
        e
    })?;

    let state = AppState::new(store, policy);
    let _ = build_rocket(rocket::custom(figment), state).launch().await?;

    Ok(())
}
