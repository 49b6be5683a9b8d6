use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::availability::SlotAvailability;
use crate::services::vehicle_data::VehicleDataService;
use crate::services::wizard::BookingWizard;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub clock: Arc<dyn Clock>,
    pub availability: Box<dyn SlotAvailability>,
    pub vehicles: VehicleDataService,
    pub wizards: Mutex<HashMap<String, BookingWizard>>,
}

impl AppState {
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("database lock poisoned")))
    }

    pub fn wizards(&self) -> Result<MutexGuard<'_, HashMap<String, BookingWizard>>, AppError> {
        self.wizards
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("wizard sessions lock poisoned")))
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }
}
