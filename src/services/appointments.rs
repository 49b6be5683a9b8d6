use serde::Serialize;

use crate::models::{Booking, BookingStatus};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAction {
    Reschedule,
    ViewDetails,
    TrackProgress,
    LeaveReview,
    ViewInvoice,
    BookAgain,
}

impl AppointmentAction {
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentAction::Reschedule => "Reschedule",
            AppointmentAction::ViewDetails => "View Details",
            AppointmentAction::TrackProgress => "Track Progress",
            AppointmentAction::LeaveReview => "Leave Review",
            AppointmentAction::ViewInvoice => "View Invoice",
            AppointmentAction::BookAgain => "Book Again",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentBucket {
    Active,
    Completed,
    Cancelled,
}

pub fn bucket_for(status: BookingStatus) -> AppointmentBucket {
    match status {
        BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::InProgress => {
            AppointmentBucket::Active
        }
        BookingStatus::Completed => AppointmentBucket::Completed,
        BookingStatus::Cancelled => AppointmentBucket::Cancelled,
    }
}

pub fn actions_for(status: BookingStatus) -> &'static [AppointmentAction] {
    use AppointmentAction::*;

    match status {
        BookingStatus::Pending | BookingStatus::Confirmed => &[Reschedule, ViewDetails],
        BookingStatus::InProgress => &[TrackProgress],
        BookingStatus::Completed => &[LeaveReview, ViewInvoice],
        BookingStatus::Cancelled => &[ViewDetails, BookAgain],
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransitionError {
    #[error("cannot move booking from {} to {}", .from.as_str(), .to.as_str())]
    NotAllowed {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("{} is not available for a {} booking", .action.label(), .status.as_str())]
    ActionUnavailable {
        action: AppointmentAction,
        status: BookingStatus,
    },
}

/// Shop-side status moves.
pub fn check_transition(from: BookingStatus, to: BookingStatus) -> Result<(), TransitionError> {
    use BookingStatus::*;

    let allowed = matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Cancelled)
            | (Confirmed, InProgress)
            | (Confirmed, Cancelled)
            | (InProgress, Completed)
    );

    if allowed {
        Ok(())
    } else {
        Err(TransitionError::NotAllowed { from, to })
    }
}

pub fn require_action(
    status: BookingStatus,
    action: AppointmentAction,
) -> Result<(), TransitionError> {
    if actions_for(status).contains(&action) {
        Ok(())
    } else {
        Err(TransitionError::ActionUnavailable { action, status })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub booking: Booking,
    pub actions: Vec<AppointmentAction>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AppointmentCounts {
    pub active: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentProjection {
    pub active: Vec<AppointmentView>,
    pub completed: Vec<AppointmentView>,
    pub cancelled: Vec<AppointmentView>,
    pub counts: AppointmentCounts,
}

/// Splits bookings into dashboard buckets, preserving input order in each.
pub fn project(bookings: Vec<Booking>) -> AppointmentProjection {
    let mut projection = AppointmentProjection::default();

    for booking in bookings {
        let view = AppointmentView {
            actions: actions_for(booking.status).to_vec(),
            booking,
        };
        match bucket_for(view.booking.status) {
            AppointmentBucket::Active => projection.active.push(view),
            AppointmentBucket::Completed => projection.completed.push(view),
            AppointmentBucket::Cancelled => projection.cancelled.push(view),
        }
    }

    projection.counts = AppointmentCounts {
        active: projection.active.len(),
        completed: projection.completed.len(),
        cancelled: projection.cancelled.len(),
        total: projection.active.len() + projection.completed.len() + projection.cancelled.len(),
    };
    projection
}
