// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;
use tripsplit::application::{ExpenseDraft, ParticipantDraft, SplitService};
use tripsplit::domain::{
    split_evenly, Expense, ExpenseCategory, ExpenseLine, ParticipantId, TripId,
};

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(SplitService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = SplitService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Helper to parse a date string into DateTime<Utc> at midnight
pub fn parse_timestamp(date_str: &str) -> DateTime<Utc> {
    parse_date(date_str).and_hms_opt(0, 0, 0).unwrap().and_utc()
}

/// Participant draft without contact details
pub fn draft(name: &str, is_owner: bool) -> ParticipantDraft {
    ParticipantDraft {
        name: name.to_string(),
        phone: None,
        email: None,
        is_owner,
    }
}

/// Test fixture: a five-day trip with three participants
pub struct StandardTrip {
    pub trip_id: TripId,
    pub ana: ParticipantId,
    pub ben: ParticipantId,
    pub chae: ParticipantId,
}

impl StandardTrip {
    /// Create "Jeju Weekend" (2024-05-01 to 2024-05-05) with Ana as owner
    /// plus Ben and Chae.
    pub async fn create(service: &SplitService) -> Result<Self> {
        let snapshot = service
            .create_trip(
                "Jeju Weekend".to_string(),
                parse_date("2024-05-01"),
                parse_date("2024-05-05"),
                vec![
                    draft("Ana", true),
                    draft("Ben", false),
                    draft("Chae", false),
                ],
            )
            .await?;

        let ids: Vec<ParticipantId> = snapshot.participants.iter().map(|p| p.id).collect();
        Ok(Self {
            trip_id: snapshot.trip.id,
            ana: ids[0],
            ben: ids[1],
            chae: ids[2],
        })
    }

    /// Record an expense paid entirely by one participant, split evenly
    /// across the given participants.
    pub async fn expense_paid_by(
        &self,
        service: &SplitService,
        title: &str,
        payer: ParticipantId,
        total: i64,
        among: &[ParticipantId],
    ) -> Result<Expense> {
        let expense = service
            .record_expense(
                self.trip_id,
                ExpenseDraft {
                    title: title.to_string(),
                    category: ExpenseCategory::Food,
                    occurred_at: parse_timestamp("2024-05-02"),
                    total_amount: total,
                    currency: None,
                    payments: vec![ExpenseLine::new(payer, total)],
                    shares: split_evenly(total, among),
                },
            )
            .await?;
        Ok(expense)
    }
}
