mod common;

use anyhow::Result;
use common::*;
use tripsplit::application::{AppError, ExpenseDraft};
use tripsplit::domain::{split_evenly, ExpenseCategory, ExpenseLine, ParticipantId, SettleScope};

/// Draft with a single payer and an even split, pinned to a given date.
fn draft_on(
    date: &str,
    title: &str,
    payer: ParticipantId,
    total: i64,
    among: &[ParticipantId],
) -> ExpenseDraft {
    ExpenseDraft {
        title: title.to_string(),
        category: ExpenseCategory::Other,
        occurred_at: parse_timestamp(date),
        total_amount: total,
        currency: None,
        payments: vec![ExpenseLine::new(payer, total)],
        shares: split_evenly(total, among),
    }
}

#[tokio::test]
async fn test_payment_sum_mismatch_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let mut draft = draft_on("2024-05-02", "Lunch", trip.ana, 100_000, &[trip.ana, trip.ben]);
    draft.payments = vec![ExpenseLine::new(trip.ana, 80_000)];

    let err = service.record_expense(trip.trip_id, draft).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::PaymentSumMismatch {
            expected: 100_000,
            actual: 80_000
        }
    ));

    Ok(())
}

#[tokio::test]
async fn test_share_sum_mismatch_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let mut draft = draft_on("2024-05-02", "Lunch", trip.ana, 100_000, &[trip.ana, trip.ben]);
    draft.shares = vec![ExpenseLine::new(trip.ben, 50_000)];

    let err = service.record_expense(trip.trip_id, draft).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::ShareSumMismatch {
            expected: 100_000,
            actual: 50_000
        }
    ));

    Ok(())
}

#[tokio::test]
async fn test_empty_payments_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let mut draft = draft_on("2024-05-02", "Lunch", trip.ana, 100_000, &[trip.ana, trip.ben]);
    draft.payments = vec![];

    let err = service.record_expense(trip.trip_id, draft).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyPayments));

    Ok(())
}

#[tokio::test]
async fn test_empty_shares_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let mut draft = draft_on("2024-05-02", "Lunch", trip.ana, 100_000, &[trip.ana, trip.ben]);
    draft.shares = vec![];

    let err = service.record_expense(trip.trip_id, draft).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyShares));

    Ok(())
}

#[tokio::test]
async fn test_empty_title_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let draft = draft_on("2024-05-02", "   ", trip.ana, 100_000, &[trip.ana, trip.ben]);

    let err = service.record_expense(trip.trip_id, draft).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyTitle));

    Ok(())
}

#[tokio::test]
async fn test_nonpositive_total_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let mut draft = draft_on("2024-05-02", "Lunch", trip.ana, 100_000, &[trip.ana]);
    draft.total_amount = 0;
    let err = service.record_expense(trip.trip_id, draft).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    let mut draft = draft_on("2024-05-02", "Lunch", trip.ana, 100_000, &[trip.ana]);
    draft.total_amount = -500;
    let err = service.record_expense(trip.trip_id, draft).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    Ok(())
}

#[tokio::test]
async fn test_unknown_participant_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let mut draft = draft_on("2024-05-02", "Lunch", trip.ana, 100_000, &[trip.ana]);
    draft.shares = vec![ExpenseLine::new(999, 100_000)];

    let err = service.record_expense(trip.trip_id, draft).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::ParticipantNotInTrip {
            participant_id: 999,
            ..
        }
    ));

    Ok(())
}

#[tokio::test]
async fn test_removed_participant_rejected_on_new_expense() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    service.remove_participant(trip.trip_id, trip.chae).await?;

    // Chae's row still exists but an inactive member cannot hold new lines.
    let draft = draft_on(
        "2024-05-02",
        "Lunch",
        trip.ana,
        90_000,
        &[trip.ana, trip.ben, trip.chae],
    );
    let err = service.record_expense(trip.trip_id, draft).await.unwrap_err();
    assert!(matches!(err, AppError::ParticipantNotInTrip { .. }));

    Ok(())
}

#[tokio::test]
async fn test_expense_outside_trip_dates_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    // The trip runs 2024-05-01 to 2024-05-05.
    let draft = draft_on("2024-06-01", "Late dinner", trip.ana, 50_000, &[trip.ana]);
    let err = service.record_expense(trip.trip_id, draft).await.unwrap_err();
    match err {
        AppError::ExpenseOutsideTripDates { date, .. } => {
            assert_eq!(date, parse_date("2024-06-01"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Boundary dates are inclusive.
    let draft = draft_on("2024-05-01", "Arrival snacks", trip.ana, 10_000, &[trip.ana]);
    service.record_expense(trip.trip_id, draft).await?;
    let draft = draft_on("2024-05-05", "Departure coffee", trip.ana, 10_000, &[trip.ana]);
    service.record_expense(trip.trip_id, draft).await?;

    Ok(())
}

#[tokio::test]
async fn test_update_replaces_lines_wholesale() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let expense = trip
        .expense_paid_by(
            &service,
            "Dinner",
            trip.ana,
            90_000,
            &[trip.ana, trip.ben, trip.chae],
        )
        .await?;

    // Turns out Ben paid, and Chae was not even there.
    let updated = service
        .update_expense(
            expense.id,
            draft_on("2024-05-03", "Dinner", trip.ben, 60_000, &[trip.ana, trip.ben]),
        )
        .await?;
    assert_eq!(updated.total_amount, 60_000);

    // The old lines are retired in place, not erased.
    let expenses = service.list_expenses(trip.trip_id).await?;
    assert_eq!(expenses.len(), 1);
    let stored = &expenses[0];
    assert_eq!(stored.payments.len(), 2);
    assert_eq!(stored.shares.len(), 5);
    assert_eq!(stored.active_payments().count(), 1);
    assert_eq!(stored.active_shares().count(), 2);
    assert_eq!(stored.payment_total(), 60_000);
    assert_eq!(stored.share_total(), 60_000);

    // Settlement sees only the replacement lines.
    let report = service
        .compute_settlement(trip.trip_id, SettleScope::Unsettled)
        .await?;
    assert_eq!(report.total_expense, 60_000);
    assert_eq!(report.balances[0].net, -30_000);
    assert_eq!(report.balances[1].net, 30_000);
    assert_eq!(report.balances[2].net, 0);

    Ok(())
}

#[tokio::test]
async fn test_delete_expense_excludes_everywhere() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;
    let everyone = [trip.ana, trip.ben, trip.chae];

    let lunch = trip
        .expense_paid_by(&service, "Lunch", trip.ana, 30_000, &everyone)
        .await?;
    trip.expense_paid_by(&service, "Dinner", trip.ben, 60_000, &everyone)
        .await?;

    service.delete_expense(lunch.id).await?;

    let expenses = service.list_expenses(trip.trip_id).await?;
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].title, "Dinner");

    let report = service
        .compute_settlement(trip.trip_id, SettleScope::All)
        .await?;
    assert_eq!(report.total_expense, 60_000);

    // A deleted expense behaves like a missing one from here on.
    let err = service.delete_expense(lunch.id).await.unwrap_err();
    assert!(matches!(err, AppError::ExpenseNotFound(_)));
    let err = service
        .update_expense(
            lunch.id,
            draft_on("2024-05-02", "Lunch", trip.ana, 30_000, &everyone),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ExpenseNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_settle_toggle_stamps_timestamp() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let expense = trip
        .expense_paid_by(&service, "Lunch", trip.ana, 30_000, &[trip.ana, trip.ben])
        .await?;
    assert!(!expense.settled);
    assert!(expense.settled_at.is_none());

    let settled = service.set_expense_settled(expense.id, true).await?;
    assert!(settled.settled);
    assert!(settled.settled_at.is_some());

    let stored = &service.list_expenses(trip.trip_id).await?[0];
    assert!(stored.settled);
    assert!(stored.settled_at.is_some());

    // Reopening clears the stamp.
    service.set_expense_settled(expense.id, false).await?;
    let stored = &service.list_expenses(trip.trip_id).await?[0];
    assert!(!stored.settled);
    assert!(stored.settled_at.is_none());

    Ok(())
}

#[tokio::test]
async fn test_list_orders_recent_first() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    for (date, title) in [
        ("2024-05-02", "Check-in dinner"),
        ("2024-05-04", "Boat tour"),
        ("2024-05-03", "Market run"),
    ] {
        service
            .record_expense(
                trip.trip_id,
                draft_on(date, title, trip.ana, 30_000, &[trip.ana, trip.ben]),
            )
            .await?;
    }

    let titles: Vec<String> = service
        .list_expenses(trip.trip_id)
        .await?
        .into_iter()
        .map(|e| e.title)
        .collect();
    assert_eq!(titles, vec!["Boat tour", "Market run", "Check-in dinner"]);

    Ok(())
}
