pub mod appointments;
pub mod availability;
pub mod search;
pub mod vehicle_data;
pub mod wizard;
