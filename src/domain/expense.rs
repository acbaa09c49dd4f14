use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Amount, ParticipantId, TripId};

pub type ExpenseId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Food,
    Accommodation,
    Transport,
    Entertainment,
    Shopping,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 6] = [
        ExpenseCategory::Food,
        ExpenseCategory::Accommodation,
        ExpenseCategory::Transport,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Shopping,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Food => "food",
            ExpenseCategory::Accommodation => "accommodation",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Entertainment => "entertainment",
            ExpenseCategory::Shopping => "shopping",
            ExpenseCategory::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "food" => Some(ExpenseCategory::Food),
            "accommodation" => Some(ExpenseCategory::Accommodation),
            "transport" => Some(ExpenseCategory::Transport),
            "entertainment" => Some(ExpenseCategory::Entertainment),
            "shopping" => Some(ExpenseCategory::Shopping),
            "other" => Some(ExpenseCategory::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which expenses a settlement run considers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleScope {
    /// Only expenses not yet marked settled.
    #[default]
    Unsettled,
    /// Every active expense, settled or not.
    All,
}

impl SettleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettleScope::Unsettled => "unsettled",
            SettleScope::All => "all",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unsettled" => Some(SettleScope::Unsettled),
            "all" => Some(SettleScope::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for SettleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One payment or share line on an expense: who, how much.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseLine {
    pub participant_id: ParticipantId,
    pub amount: Amount,
    pub active: bool,
}

impl ExpenseLine {
    pub fn new(participant_id: ParticipantId, amount: Amount) -> Self {
        Self {
            participant_id,
            amount,
            active: true,
        }
    }
}

/// A spending event on a trip. Payments record who fronted the money,
/// shares record who owes a portion; both must sum to the total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub trip_id: TripId,
    pub title: String,
    pub category: ExpenseCategory,
    /// When the spending happened in the real world.
    pub occurred_at: DateTime<Utc>,
    pub total_amount: Amount,
    /// Informational only; never converted.
    pub currency: String,
    pub active: bool,
    pub settled: bool,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub payments: Vec<ExpenseLine>,
    pub shares: Vec<ExpenseLine>,
}

impl Expense {
    /// Create a new expense. The id is assigned by the repository on save.
    pub fn new(
        trip_id: TripId,
        title: String,
        category: ExpenseCategory,
        occurred_at: DateTime<Utc>,
        total_amount: Amount,
    ) -> Self {
        Self {
            id: 0,
            trip_id,
            title,
            category,
            occurred_at,
            total_amount,
            currency: "KRW".to_string(),
            active: true,
            settled: false,
            settled_at: None,
            created_at: Utc::now(),
            payments: Vec::new(),
            shares: Vec::new(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_payments(mut self, payments: Vec<ExpenseLine>) -> Self {
        self.payments = payments;
        self
    }

    pub fn with_shares(mut self, shares: Vec<ExpenseLine>) -> Self {
        self.shares = shares;
        self
    }

    pub fn active_payments(&self) -> impl Iterator<Item = &ExpenseLine> {
        self.payments.iter().filter(|l| l.active)
    }

    pub fn active_shares(&self) -> impl Iterator<Item = &ExpenseLine> {
        self.shares.iter().filter(|l| l.active)
    }

    pub fn payment_total(&self) -> Amount {
        self.active_payments().map(|l| l.amount).sum()
    }

    pub fn share_total(&self) -> Amount {
        self.active_shares().map(|l| l.amount).sum()
    }
}

/// Split a total evenly across participants. The integer remainder is spread
/// one unit each over the first participants, so the sum always equals the
/// total.
pub fn split_evenly(total: Amount, participants: &[ParticipantId]) -> Vec<ExpenseLine> {
    if participants.is_empty() {
        return Vec::new();
    }

    let n = participants.len() as i64;
    let base = total / n;
    let remainder = total % n;

    participants
        .iter()
        .enumerate()
        .map(|(i, &id)| {
            let extra = if (i as i64) < remainder { 1 } else { 0 };
            ExpenseLine::new(id, base + extra)
        })
        .collect()
}
