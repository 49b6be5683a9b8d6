use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use mechanicsmatch::clock::{Clock, SystemClock};
use mechanicsmatch::config::AppConfig;
use mechanicsmatch::db;
use mechanicsmatch::handlers;
use mechanicsmatch::services::availability::RandomAvailability;
use mechanicsmatch::services::vehicle_data::cache::VehicleDataCache;
use mechanicsmatch::services::vehicle_data::nhtsa::NhtsaClient;
use mechanicsmatch::services::vehicle_data::VehicleDataService;
use mechanicsmatch::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    tracing::info!(
        "using vehicle data API at {} (cache ttl {}s)",
        config.vehicle_api_url,
        config.vehicle_cache_ttl_secs
    );
    let nhtsa = NhtsaClient::new(
        config.vehicle_api_url.clone(),
        Duration::from_secs(config.vehicle_api_timeout_secs),
    )?;
    let cache = VehicleDataCache::new(
        chrono::Duration::seconds(config.vehicle_cache_ttl_secs),
        clock.clone(),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        clock,
        availability: Box::new(RandomAvailability),
        vehicles: VehicleDataService::new(Box::new(nhtsa), cache),
        wizards: Mutex::new(HashMap::new()),
    });

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
