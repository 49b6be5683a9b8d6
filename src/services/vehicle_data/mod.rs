pub mod cache;
pub mod catalog;
pub mod nhtsa;

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{VehicleOption, VehicleSource};

pub use cache::VehicleDataCache;

pub const DEFAULT_VEHICLE_TYPE: &str = "car";

/// Remote provider of make and model names.
#[async_trait]
pub trait VehicleDataSource: Send + Sync {
    async fn makes(&self, vehicle_type: &str) -> anyhow::Result<Vec<String>>;
    async fn models(&self, make: &str, year: i32) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleLookup {
    pub options: Vec<VehicleOption>,
    pub source: VehicleSource,
}

/// Resolves vehicle reference lists from the cache, the remote source, or the
/// built-in tables, in that order. Never fails.
pub struct VehicleDataService {
    source: Box<dyn VehicleDataSource>,
    cache: VehicleDataCache,
}

impl VehicleDataService {
    pub fn new(source: Box<dyn VehicleDataSource>, cache: VehicleDataCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &VehicleDataCache {
        &self.cache
    }

    pub async fn makes(&self, vehicle_type: Option<&str>) -> VehicleLookup {
        let vehicle_type = vehicle_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_VEHICLE_TYPE)
            .to_lowercase();
        let key = format!("nhtsa-makes-{vehicle_type}");

        self.resolve(&key, self.source.makes(&vehicle_type), catalog::makes)
            .await
    }

    pub async fn models(&self, make: &str, year: i32) -> VehicleLookup {
        let make = make.trim();
        if make.is_empty() {
            return VehicleLookup {
                options: Vec::new(),
                source: VehicleSource::Static,
            };
        }
        let key = format!("nhtsa-models-{make}-{year}");

        self.resolve(&key, self.source.models(make, year), || {
            catalog::models_for(make)
        })
        .await
    }

    /// Trims only exist in the built-in tables.
    pub fn trims(&self, make: &str, model: &str) -> VehicleLookup {
        VehicleLookup {
            options: catalog::trims_for(make, model),
            source: VehicleSource::Static,
        }
    }

    async fn resolve<F, S>(&self, key: &str, fetch: F, fallback: S) -> VehicleLookup
    where
        F: Future<Output = anyhow::Result<Vec<String>>>,
        S: FnOnce() -> Vec<VehicleOption>,
    {
        if let Some(options) = self.cache.get(key) {
            tracing::debug!(key, "vehicle lookup served from cache");
            return VehicleLookup {
                options,
                source: VehicleSource::Cache,
            };
        }

        match fetch.await {
            Ok(names) => {
                let options = normalize(names);
                if options.is_empty() {
                    tracing::info!(key, "vehicle API returned no results, using built-in table");
                    return VehicleLookup {
                        options: fallback(),
                        source: VehicleSource::Static,
                    };
                }
                self.cache.put(key, options.clone());
                VehicleLookup {
                    options,
                    source: VehicleSource::Api,
                }
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "vehicle API lookup failed, using built-in table");
                VehicleLookup {
                    options: fallback(),
                    source: VehicleSource::Static,
                }
            }
        }
    }
}

/// Trims names, drops blanks and case-insensitive duplicates, sorts by name.
fn normalize(names: Vec<String>) -> Vec<VehicleOption> {
    let mut by_key: BTreeMap<String, String> = BTreeMap::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        by_key
            .entry(name.to_lowercase())
            .or_insert_with(|| name.to_string());
    }
    by_key
        .values()
        .map(|name| VehicleOption::from_name(name))
        .collect()
}
