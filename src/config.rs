use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub vehicle_api_url: String,
    pub vehicle_cache_ttl_secs: i64,
    pub vehicle_api_timeout_secs: u64,
    pub submit_latency_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "mechanicsmatch.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            vehicle_api_url: env::var("VEHICLE_API_URL")
                .unwrap_or_else(|_| "https://vpic.nhtsa.dot.gov/api/vehicles".to_string()),
            vehicle_cache_ttl_secs: env::var("VEHICLE_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            vehicle_api_timeout_secs: env::var("VEHICLE_API_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            submit_latency_ms: env::var("SUBMIT_LATENCY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1500),
        }
    }
}
