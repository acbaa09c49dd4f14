use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Amount, ExpenseId, ParticipantId, TripId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Trip not found: {0}")]
    TripNotFound(TripId),

    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    #[error("Participant {participant_id} is not an active member of trip {trip_id}")]
    ParticipantNotInTrip {
        trip_id: TripId,
        participant_id: ParticipantId,
    },

    #[error("A trip needs a name")]
    EmptyTripName,

    #[error("A trip needs at least one participant")]
    NoParticipants,

    #[error("A participant needs a name")]
    EmptyParticipantName,

    #[error("A trip needs exactly one owner, got {0}")]
    OwnerCountInvalid(usize),

    #[error("The trip owner cannot be removed: {0}")]
    OwnerNotRemovable(ParticipantId),

    #[error("An expense needs a title")]
    EmptyTitle,

    #[error("An expense needs at least one payment")]
    EmptyPayments,

    #[error("An expense needs at least one share")]
    EmptyShares,

    #[error("Payments sum to {actual}, expected the expense total {expected}")]
    PaymentSumMismatch { expected: Amount, actual: Amount },

    #[error("Shares sum to {actual}, expected the expense total {expected}")]
    ShareSumMismatch { expected: Amount, actual: Amount },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Expense '{title}' on {date} falls outside the trip dates")]
    ExpenseOutsideTripDates { title: String, date: NaiveDate },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
