use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Booking, BookingStatus, PaymentStatus, Service, TimeSlot, User};
use crate::services::availability::{generate_time_slots, SlotAvailability};

/// How many days past tomorrow an appointment may be booked.
pub const BOOKING_WINDOW_DAYS: i64 = 29;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    ServiceSelection = 1,
    DateTime = 2,
    VehicleInfo = 3,
    ContactInfo = 4,
    Confirmed = 5,
}

impl WizardStep {
    pub fn number(&self) -> u8 {
        *self as u8
    }

    fn following(&self) -> Option<WizardStep> {
        match self {
            WizardStep::ServiceSelection => Some(WizardStep::DateTime),
            WizardStep::DateTime => Some(WizardStep::VehicleInfo),
            WizardStep::VehicleInfo => Some(WizardStep::ContactInfo),
            WizardStep::ContactInfo => Some(WizardStep::Confirmed),
            WizardStep::Confirmed => None,
        }
    }

    fn preceding(&self) -> Option<WizardStep> {
        match self {
            WizardStep::ServiceSelection | WizardStep::Confirmed => None,
            WizardStep::DateTime => Some(WizardStep::ServiceSelection),
            WizardStep::VehicleInfo => Some(WizardStep::DateTime),
            WizardStep::ContactInfo => Some(WizardStep::VehicleInfo),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WizardError {
    #[error("step {} is incomplete, missing: {}", .step.number(), .missing.join(", "))]
    Incomplete {
        step: WizardStep,
        missing: Vec<&'static str>,
    },

    #[error("already at the first step")]
    AtFirstStep,

    #[error("booking already confirmed")]
    Finished,

    #[error("contact details are submitted, not advanced")]
    SubmitRequired,

    #[error("can only submit from the contact step (currently at step {})", .0.number())]
    NotReadyToSubmit(WizardStep),

    #[error("submission already in progress")]
    SubmissionInProgress,

    #[error("appointment date {date} must be between {earliest} and {latest}")]
    DateOutOfRange {
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },

    #[error("select a date before choosing a time")]
    NoDateSelected,

    #[error("time slot {0} is not available")]
    TimeUnavailable(String),

    #[error("service {0} is not offered by this shop")]
    UnknownService(String),
}

const FORM_STEPS: [WizardStep; 4] = [
    WizardStep::ServiceSelection,
    WizardStep::DateTime,
    WizardStep::VehicleInfo,
    WizardStep::ContactInfo,
];

/// Fields collected across the wizard steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookingDraft {
    pub service_id: String,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: String,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: String,
    pub vehicle_vin: String,
    pub problem_description: String,
    pub special_instructions: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

impl BookingDraft {
    /// Required fields still blank for `step`, in display order.
    pub fn missing_for(&self, step: WizardStep) -> Vec<&'static str> {
        let required: Vec<(&'static str, bool)> = match step {
            WizardStep::ServiceSelection => vec![("service_id", filled(&self.service_id))],
            WizardStep::DateTime => vec![
                ("appointment_date", self.appointment_date.is_some()),
                ("appointment_time", filled(&self.appointment_time)),
            ],
            WizardStep::VehicleInfo => vec![
                ("vehicle_make", filled(&self.vehicle_make)),
                ("vehicle_model", filled(&self.vehicle_model)),
                ("vehicle_year", filled(&self.vehicle_year)),
                ("problem_description", filled(&self.problem_description)),
            ],
            WizardStep::ContactInfo => vec![
                ("customer_name", filled(&self.customer_name)),
                ("customer_email", filled(&self.customer_email)),
                ("customer_phone", filled(&self.customer_phone)),
            ],
            WizardStep::Confirmed => vec![],
        };

        required
            .into_iter()
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| name)
            .collect()
    }

    /// First step before `until` whose guard fails, with its missing fields.
    pub fn first_incomplete(&self, until: WizardStep) -> Option<(WizardStep, Vec<&'static str>)> {
        FORM_STEPS
            .iter()
            .filter(|step| **step < until)
            .map(|step| (*step, self.missing_for(*step)))
            .find(|(_, missing)| !missing.is_empty())
    }

    pub fn into_booking(
        self,
        id: String,
        shop_id: String,
        customer_id: String,
        now: NaiveDateTime,
    ) -> Result<Booking, WizardError> {
        let appointment_date = self.appointment_date.ok_or(WizardError::Incomplete {
            step: WizardStep::DateTime,
            missing: vec!["appointment_date"],
        })?;

        Ok(Booking {
            id,
            customer_id,
            shop_id,
            service_id: self.service_id,
            appointment_date,
            appointment_time: self.appointment_time,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            vehicle_make: self.vehicle_make.trim().to_string(),
            vehicle_model: self.vehicle_model.trim().to_string(),
            vehicle_year: self.vehicle_year.trim().to_string(),
            problem_description: self.problem_description.trim().to_string(),
            special_instructions: Some(self.special_instructions.trim().to_string())
                .filter(|s| !s.is_empty()),
            estimated_cost: None,
            final_cost: None,
            created_at: now,
            updated_at: now,
        })
    }
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Partial edit of the draft. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftUpdate {
    pub service_id: Option<String>,
    pub appointment_time: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<String>,
    pub vehicle_vin: Option<String>,
    pub problem_description: Option<String>,
    pub special_instructions: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

/// Earliest and latest selectable appointment dates relative to `today`.
pub fn date_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let earliest = today + Duration::days(1);
    (earliest, earliest + Duration::days(BOOKING_WINDOW_DAYS))
}

/// One customer's pass through the booking flow for a single shop.
#[derive(Debug, Clone, Serialize)]
pub struct BookingWizard {
    pub id: String,
    pub shop_id: String,
    pub customer_id: String,
    pub step: WizardStep,
    pub draft: BookingDraft,
    pub time_slots: Vec<TimeSlot>,
    pub submitting: bool,
    pub booking_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BookingWizard {
    pub fn new(id: String, shop_id: String, customer_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            shop_id,
            customer_id,
            step: WizardStep::ServiceSelection,
            draft: BookingDraft::default(),
            time_slots: Vec::new(),
            submitting: false,
            booking_id: None,
            created_at: now,
        }
    }

    /// Seeds contact fields from the signed-in profile.
    pub fn prefill_contact(&mut self, user: &User) {
        let name = user.full_name();
        if !name.is_empty() {
            self.draft.customer_name = name;
        }
        self.draft.customer_email = user.email.clone();
        if let Some(phone) = &user.phone {
            self.draft.customer_phone = phone.clone();
        }
    }

    pub fn can_advance(&self) -> bool {
        self.step != WizardStep::Confirmed && self.draft.missing_for(self.step).is_empty()
    }

    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::Confirmed => return Err(WizardError::Finished),
            WizardStep::ContactInfo => return Err(WizardError::SubmitRequired),
            _ => {}
        }

        let missing = self.draft.missing_for(self.step);
        if !missing.is_empty() {
            return Err(WizardError::Incomplete {
                step: self.step,
                missing,
            });
        }

        if let Some(step) = self.step.following() {
            self.step = step;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::Confirmed => Err(WizardError::Finished),
            _ if self.submitting => Err(WizardError::SubmissionInProgress),
            step => {
                let previous = step.preceding().ok_or(WizardError::AtFirstStep)?;
                self.step = previous;
                Ok(previous)
            }
        }
    }

    /// Picks the appointment date. A different date regenerates the slot
    /// list and clears the chosen time.
    pub fn select_date(
        &mut self,
        date: NaiveDate,
        today: NaiveDate,
        availability: &dyn SlotAvailability,
    ) -> Result<&[TimeSlot], WizardError> {
        self.ensure_editable()?;

        let (earliest, latest) = date_bounds(today);
        if date < earliest || date > latest {
            return Err(WizardError::DateOutOfRange {
                date,
                earliest,
                latest,
            });
        }

        if self.draft.appointment_date != Some(date) {
            self.draft.appointment_date = Some(date);
            self.draft.appointment_time.clear();
            self.time_slots = generate_time_slots(availability, &self.shop_id, date);
        }

        Ok(&self.time_slots)
    }

    /// Applies a partial edit. `services` is the shop's service list.
    pub fn update(&mut self, update: DraftUpdate, services: &[Service]) -> Result<(), WizardError> {
        self.ensure_editable()?;

        if let Some(service_id) = &update.service_id {
            if !service_id.is_empty()
                && !services
                    .iter()
                    .any(|s| &s.id == service_id && s.shop_id == self.shop_id)
            {
                return Err(WizardError::UnknownService(service_id.clone()));
            }
        }

        if let Some(time) = &update.appointment_time {
            if !time.is_empty() {
                if self.draft.appointment_date.is_none() {
                    return Err(WizardError::NoDateSelected);
                }
                let open = self
                    .time_slots
                    .iter()
                    .any(|slot| &slot.time == time && slot.available);
                if !open {
                    return Err(WizardError::TimeUnavailable(time.clone()));
                }
            }
        }

        let mut draft = self.draft.clone();
        let fields = [
            (update.service_id, &mut draft.service_id),
            (update.appointment_time, &mut draft.appointment_time),
            (update.vehicle_make, &mut draft.vehicle_make),
            (update.vehicle_model, &mut draft.vehicle_model),
            (update.vehicle_year, &mut draft.vehicle_year),
            (update.vehicle_vin, &mut draft.vehicle_vin),
            (update.problem_description, &mut draft.problem_description),
            (update.special_instructions, &mut draft.special_instructions),
            (update.customer_name, &mut draft.customer_name),
            (update.customer_email, &mut draft.customer_email),
            (update.customer_phone, &mut draft.customer_phone),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }

        // Steps already passed must stay complete
        if let Some((step, missing)) = draft.first_incomplete(self.step) {
            return Err(WizardError::Incomplete { step, missing });
        }

        self.draft = draft;
        Ok(())
    }

    /// Marks the wizard in flight and hands back the draft to persist.
    pub fn begin_submit(&mut self) -> Result<BookingDraft, WizardError> {
        if self.step == WizardStep::Confirmed {
            return Err(WizardError::Finished);
        }
        if self.submitting {
            return Err(WizardError::SubmissionInProgress);
        }
        if self.step != WizardStep::ContactInfo {
            return Err(WizardError::NotReadyToSubmit(self.step));
        }

        if let Some((step, missing)) = self.draft.first_incomplete(WizardStep::Confirmed) {
            return Err(WizardError::Incomplete { step, missing });
        }

        self.submitting = true;
        Ok(self.draft.clone())
    }

    pub fn complete_submit(&mut self, booking_id: String) {
        self.submitting = false;
        self.booking_id = Some(booking_id);
        self.step = WizardStep::Confirmed;
    }

    /// Re-enables submission after the booking could not be stored.
    pub fn abort_submit(&mut self) {
        self.submitting = false;
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.created_at > max_age
    }

    fn ensure_editable(&self) -> Result<(), WizardError> {
        if self.step == WizardStep::Confirmed {
            return Err(WizardError::Finished);
        }
        if self.submitting {
            return Err(WizardError::SubmissionInProgress);
        }
        Ok(())
    }
}
