use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub id: String,
    pub customer_id: String,
    pub car_make: String,
    pub car_model: String,
    pub car_trim: Option<String>,
    pub car_year: i32,
    pub car_license_plate: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCar {
    pub car_make: String,
    pub car_model: String,
    pub car_trim: Option<String>,
    pub car_year: i32,
    pub car_license_plate: Option<String>,
}

impl NewCar {
    /// Checks required fields and that the year is a plausible model year.
    pub fn validate(&self, current_year: i32) -> Result<(), String> {
        if self.car_make.trim().is_empty() {
            return Err("car_make is required".to_string());
        }
        if self.car_model.trim().is_empty() {
            return Err("car_model is required".to_string());
        }
        if self.car_year < 1900 || self.car_year > current_year + 1 {
            return Err(format!(
                "car_year must be between 1900 and {}",
                current_year + 1
            ));
        }
        Ok(())
    }

    pub fn into_car(self, id: String, customer_id: String) -> Car {
        Car {
            id,
            customer_id,
            car_make: self.car_make.trim().to_string(),
            car_model: self.car_model.trim().to_string(),
            car_trim: self.car_trim.filter(|t| !t.trim().is_empty()),
            car_year: self.car_year,
            car_license_plate: self
                .car_license_plate
                .map(|p| p.trim().to_uppercase())
                .filter(|p| !p.is_empty()),
        }
    }
}
