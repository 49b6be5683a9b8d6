use chrono::NaiveDate;
use rand::Rng;

use crate::models::TimeSlot;

/// Candidate appointment times offered for every date. Noon is lunch.
pub const CANDIDATE_TIMES: [&str; 7] = [
    "09:00", "10:00", "11:00", "13:00", "14:00", "15:00", "16:00",
];

/// Decides whether a shop can take an appointment at a given time.
pub trait SlotAvailability: Send + Sync {
    fn is_available(&self, shop_id: &str, date: NaiveDate, time: &str) -> bool;
}

/// Marks each slot open or taken by coin flip.
///
/// Stands in for a real scheduling service; nothing here reflects shop hours
/// or existing bookings.
pub struct RandomAvailability;

impl SlotAvailability for RandomAvailability {
    fn is_available(&self, _shop_id: &str, _date: NaiveDate, _time: &str) -> bool {
        rand::thread_rng().gen_bool(0.5)
    }
}

/// Every slot is open.
pub struct AlwaysAvailable;

impl SlotAvailability for AlwaysAvailable {
    fn is_available(&self, _shop_id: &str, _date: NaiveDate, _time: &str) -> bool {
        true
    }
}

pub fn generate_time_slots(
    availability: &dyn SlotAvailability,
    shop_id: &str,
    date: NaiveDate,
) -> Vec<TimeSlot> {
    CANDIDATE_TIMES
        .iter()
        .enumerate()
        .map(|(i, time)| TimeSlot {
            id: (i + 1).to_string(),
            time: time.to_string(),
            available: availability.is_available(shop_id, date, time),
        })
        .collect()
}
