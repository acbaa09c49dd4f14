use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Expense;

pub type TripId = i64;
pub type ParticipantId = i64;

/// A trip groups participants and the expenses they share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Soft-delete flag; inactive trips are hidden from listings but never erased.
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    /// Create a new trip. The id is assigned by the repository on save.
    pub fn new(name: String, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: 0,
            name,
            start_date,
            end_date,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// A person on a trip. Participants are plain names, not accounts; the same
/// person on two trips is two participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub trip_id: TripId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Exactly one owner per trip; the owner cannot be removed.
    pub is_owner: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Create a new participant. The id is assigned by the repository on save.
    pub fn new(trip_id: TripId, name: String) -> Self {
        Self {
            id: 0,
            trip_id,
            name,
            phone: None,
            email: None,
            is_owner: false,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn as_owner(mut self) -> Self {
        self.is_owner = true;
        self
    }
}

/// A trip with its full participant and expense graph, flattened for one
/// settlement computation. Rows appear in insertion (id) order and include
/// soft-deleted entries; filtering happens at computation time.
#[derive(Debug, Clone)]
pub struct TripSnapshot {
    pub trip: Trip,
    pub participants: Vec<Participant>,
    pub expenses: Vec<Expense>,
}

impl TripSnapshot {
    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.active)
    }

    pub fn owner(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.active && p.is_owner)
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }
}
