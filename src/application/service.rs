use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    settle, Expense, ExpenseCategory, ExpenseId, ExpenseLine, Participant, ParticipantId,
    SettleScope, SettlementReport, Trip, TripId, TripSnapshot,
};
use crate::storage::Repository;

use super::reporting::{build_trip_statistics, TripStatistics};
use super::AppError;

/// Application service providing high-level operations over the trip ledger.
/// This is the primary interface for any client (CLI, export, tests).
pub struct SplitService {
    repo: Repository,
}

/// Participant details supplied when creating a trip or adding people later.
pub struct ParticipantDraft {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_owner: bool,
}

/// Expense details supplied when recording or editing an expense.
pub struct ExpenseDraft {
    pub title: String,
    pub category: ExpenseCategory,
    pub occurred_at: DateTime<Utc>,
    pub total_amount: i64,
    pub currency: Option<String>,
    pub payments: Vec<ExpenseLine>,
    pub shares: Vec<ExpenseLine>,
}

impl SplitService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Trip operations
    // ========================

    /// Create a trip together with its initial participants. Exactly one of
    /// the drafts must be flagged as owner.
    pub async fn create_trip(
        &self,
        name: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        participants: Vec<ParticipantDraft>,
    ) -> Result<TripSnapshot, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::EmptyTripName);
        }
        if start_date > end_date {
            return Err(AppError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        if participants.is_empty() {
            return Err(AppError::NoParticipants);
        }
        let owner_count = participants.iter().filter(|p| p.is_owner).count();
        if owner_count != 1 {
            return Err(AppError::OwnerCountInvalid(owner_count));
        }
        if participants.iter().any(|p| p.name.trim().is_empty()) {
            return Err(AppError::EmptyParticipantName);
        }

        let mut trip = Trip::new(name, start_date, end_date);
        self.repo.save_trip(&mut trip).await?;

        for draft in participants {
            let mut participant = Participant::new(trip.id, draft.name);
            if let Some(phone) = draft.phone {
                participant = participant.with_phone(phone);
            }
            if let Some(email) = draft.email {
                participant = participant.with_email(email);
            }
            if draft.is_owner {
                participant = participant.as_owner();
            }
            self.repo.save_participant(&mut participant).await?;
        }

        self.get_trip(trip.id).await
    }

    /// Load a trip with its full participant and expense graph.
    pub async fn get_trip(&self, trip_id: TripId) -> Result<TripSnapshot, AppError> {
        self.repo
            .load_trip(trip_id)
            .await?
            .ok_or(AppError::TripNotFound(trip_id))
    }

    /// List active trips, most recently created first.
    pub async fn list_trips(&self) -> Result<Vec<Trip>, AppError> {
        Ok(self.repo.list_trips().await?)
    }

    /// Soft-delete a trip. Its data stays queryable by id.
    pub async fn delete_trip(&self, trip_id: TripId) -> Result<Trip, AppError> {
        let snapshot = self.get_trip(trip_id).await?;
        self.repo.soft_delete_trip(trip_id).await?;
        Ok(snapshot.trip)
    }

    /// Change a trip's date range. Rejected if any active expense would fall
    /// outside the new range.
    pub async fn update_trip_dates(
        &self,
        trip_id: TripId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Trip, AppError> {
        if start_date > end_date {
            return Err(AppError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }

        let snapshot = self.get_trip(trip_id).await?;
        for expense in snapshot.expenses.iter().filter(|e| e.active) {
            let date = expense.occurred_at.date_naive();
            if date < start_date || date > end_date {
                return Err(AppError::ExpenseOutsideTripDates {
                    title: expense.title.clone(),
                    date,
                });
            }
        }

        self.repo
            .update_trip_dates(trip_id, start_date, end_date)
            .await?;

        let mut trip = snapshot.trip;
        trip.start_date = start_date;
        trip.end_date = end_date;
        Ok(trip)
    }

    // ========================
    // Participant operations
    // ========================

    /// Add a participant to an existing trip, always as a non-owner.
    pub async fn add_participant(
        &self,
        trip_id: TripId,
        draft: ParticipantDraft,
    ) -> Result<Participant, AppError> {
        if draft.name.trim().is_empty() {
            return Err(AppError::EmptyParticipantName);
        }
        self.get_trip(trip_id).await?;

        let mut participant = Participant::new(trip_id, draft.name);
        if let Some(phone) = draft.phone {
            participant = participant.with_phone(phone);
        }
        if let Some(email) = draft.email {
            participant = participant.with_email(email);
        }

        self.repo.save_participant(&mut participant).await?;
        Ok(participant)
    }

    /// Soft-delete a participant. The owner cannot be removed. Any expense
    /// lines the participant holds stay active; settlement drops them and
    /// logs the resulting drift.
    pub async fn remove_participant(
        &self,
        trip_id: TripId,
        participant_id: ParticipantId,
    ) -> Result<Participant, AppError> {
        let participant = self
            .repo
            .get_participant(participant_id)
            .await?
            .ok_or(AppError::ParticipantNotFound(participant_id))?;

        if participant.trip_id != trip_id {
            return Err(AppError::ParticipantNotInTrip {
                trip_id,
                participant_id,
            });
        }
        if participant.is_owner {
            return Err(AppError::OwnerNotRemovable(participant_id));
        }

        self.repo.soft_delete_participant(participant_id).await?;
        Ok(participant)
    }

    // ========================
    // Expense operations
    // ========================

    /// Record a new expense with its payment and share lines.
    pub async fn record_expense(
        &self,
        trip_id: TripId,
        draft: ExpenseDraft,
    ) -> Result<Expense, AppError> {
        let snapshot = self.get_trip(trip_id).await?;
        self.validate_expense(&snapshot, &draft)?;

        let mut expense = Expense::new(
            trip_id,
            draft.title,
            draft.category,
            draft.occurred_at,
            draft.total_amount,
        )
        .with_payments(draft.payments)
        .with_shares(draft.shares);
        if let Some(currency) = draft.currency {
            expense = expense.with_currency(currency);
        }

        self.repo.save_expense(&mut expense).await?;
        Ok(expense)
    }

    /// Replace an expense's details and lines. Existing lines are retired
    /// wholesale and the draft's lines inserted in their place.
    pub async fn update_expense(
        &self,
        expense_id: ExpenseId,
        draft: ExpenseDraft,
    ) -> Result<Expense, AppError> {
        let mut expense = self.get_active_expense(expense_id).await?;
        let snapshot = self.get_trip(expense.trip_id).await?;
        self.validate_expense(&snapshot, &draft)?;

        expense.title = draft.title;
        expense.category = draft.category;
        expense.occurred_at = draft.occurred_at;
        expense.total_amount = draft.total_amount;
        if let Some(currency) = draft.currency {
            expense.currency = currency;
        }
        expense.payments = draft.payments;
        expense.shares = draft.shares;

        self.repo.replace_expense(&expense).await?;
        Ok(expense)
    }

    /// Soft-delete an expense and all its lines.
    pub async fn delete_expense(&self, expense_id: ExpenseId) -> Result<Expense, AppError> {
        let expense = self.get_active_expense(expense_id).await?;
        self.repo.soft_delete_expense(expense_id).await?;
        Ok(expense)
    }

    /// Mark an expense settled or reopen it. Settling stamps the time;
    /// reopening clears it.
    pub async fn set_expense_settled(
        &self,
        expense_id: ExpenseId,
        settled: bool,
    ) -> Result<Expense, AppError> {
        let mut expense = self.get_active_expense(expense_id).await?;

        expense.settled = settled;
        expense.settled_at = if settled { Some(Utc::now()) } else { None };

        self.repo
            .update_expense_settled(expense_id, settled, expense.settled_at)
            .await?;
        Ok(expense)
    }

    /// List a trip's active expenses, most recent first.
    pub async fn list_expenses(&self, trip_id: TripId) -> Result<Vec<Expense>, AppError> {
        self.get_trip(trip_id).await?;
        Ok(self.repo.list_expenses(trip_id).await?)
    }

    async fn get_active_expense(&self, expense_id: ExpenseId) -> Result<Expense, AppError> {
        let expense = self
            .repo
            .get_expense(expense_id)
            .await?
            .ok_or(AppError::ExpenseNotFound(expense_id))?;
        if !expense.active {
            return Err(AppError::ExpenseNotFound(expense_id));
        }
        Ok(expense)
    }

    fn validate_expense(
        &self,
        snapshot: &TripSnapshot,
        draft: &ExpenseDraft,
    ) -> Result<(), AppError> {
        if draft.title.trim().is_empty() {
            return Err(AppError::EmptyTitle);
        }
        if draft.total_amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Expense total must be positive".to_string(),
            ));
        }
        if draft.payments.is_empty() {
            return Err(AppError::EmptyPayments);
        }
        if draft.shares.is_empty() {
            return Err(AppError::EmptyShares);
        }

        let payment_sum: i64 = draft.payments.iter().map(|l| l.amount).sum();
        if payment_sum != draft.total_amount {
            return Err(AppError::PaymentSumMismatch {
                expected: draft.total_amount,
                actual: payment_sum,
            });
        }
        let share_sum: i64 = draft.shares.iter().map(|l| l.amount).sum();
        if share_sum != draft.total_amount {
            return Err(AppError::ShareSumMismatch {
                expected: draft.total_amount,
                actual: share_sum,
            });
        }

        for line in draft.payments.iter().chain(draft.shares.iter()) {
            let member = snapshot
                .participant(line.participant_id)
                .is_some_and(|p| p.active);
            if !member {
                return Err(AppError::ParticipantNotInTrip {
                    trip_id: snapshot.trip.id,
                    participant_id: line.participant_id,
                });
            }
        }

        let date = draft.occurred_at.date_naive();
        if !snapshot.trip.contains_date(date) {
            return Err(AppError::ExpenseOutsideTripDates {
                title: draft.title.clone(),
                date,
            });
        }

        Ok(())
    }

    // ========================
    // Settlement and statistics
    // ========================

    /// Compute who owes whom for a trip. Pure read; the ledger is never
    /// modified.
    pub async fn compute_settlement(
        &self,
        trip_id: TripId,
        scope: SettleScope,
    ) -> Result<SettlementReport, AppError> {
        let snapshot = self.get_trip(trip_id).await?;
        Ok(settle(&snapshot, scope))
    }

    /// Per-category spending breakdown for a trip.
    pub async fn trip_statistics(&self, trip_id: TripId) -> Result<TripStatistics, AppError> {
        let snapshot = self.get_trip(trip_id).await?;
        Ok(build_trip_statistics(&snapshot))
    }
}
