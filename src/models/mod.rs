pub mod booking;
pub mod car;
pub mod review;
pub mod service;
pub mod shop;
pub mod time_slot;
pub mod user;
pub mod vehicle;

pub use booking::{Booking, BookingStatus, PaymentStatus};
pub use car::{Car, NewCar};
pub use review::Review;
pub use service::Service;
pub use shop::Shop;
pub use time_slot::TimeSlot;
pub use user::{User, UserType};
pub use vehicle::{VehicleOption, VehicleSource};
