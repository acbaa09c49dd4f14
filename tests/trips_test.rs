mod common;

use anyhow::Result;
use common::*;
use tripsplit::application::AppError;

#[tokio::test]
async fn test_create_trip_returns_full_roster() -> Result<()> {
    let (service, _temp) = test_service().await?;

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

    assert!(snapshot.trip.id > 0);
    assert!(snapshot.trip.active);
    assert_eq!(snapshot.participants.len(), 3);
    assert!(snapshot.expenses.is_empty());

    let owner = snapshot.owner().unwrap();
    assert_eq!(owner.name, "Ana");
    assert!(owner.is_owner);

    Ok(())
}

#[tokio::test]
async fn test_owner_count_must_be_one() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service
        .create_trip(
            "No owner".to_string(),
            parse_date("2024-05-01"),
            parse_date("2024-05-05"),
            vec![draft("Ana", false), draft("Ben", false)],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OwnerCountInvalid(0)));

    let err = service
        .create_trip(
            "Two owners".to_string(),
            parse_date("2024-05-01"),
            parse_date("2024-05-05"),
            vec![draft("Ana", true), draft("Ben", true)],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OwnerCountInvalid(2)));

    Ok(())
}

#[tokio::test]
async fn test_create_trip_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let start = parse_date("2024-05-01");
    let end = parse_date("2024-05-05");

    let err = service
        .create_trip("  ".to_string(), start, end, vec![draft("Ana", true)])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyTripName));

    let err = service
        .create_trip("Backwards".to_string(), end, start, vec![draft("Ana", true)])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidDateRange { .. }));

    let err = service
        .create_trip("Nobody".to_string(), start, end, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoParticipants));

    let err = service
        .create_trip(
            "Blank name".to_string(),
            start,
            end,
            vec![draft("Ana", true), draft("", false)],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyParticipantName));

    Ok(())
}

#[tokio::test]
async fn test_owner_cannot_be_removed() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let err = service
        .remove_participant(trip.trip_id, trip.ana)
        .await
        .unwrap_err();
    match err {
        AppError::OwnerNotRemovable(id) => assert_eq!(id, trip.ana),
        other => panic!("unexpected error: {other}"),
    }

    // The roster is untouched.
    let snapshot = service.get_trip(trip.trip_id).await?;
    assert_eq!(snapshot.active_participants().count(), 3);

    Ok(())
}

#[tokio::test]
async fn test_remove_participant_guards() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let err = service
        .remove_participant(trip.trip_id, 999)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ParticipantNotFound(999)));

    // A member of another trip cannot be removed through this one.
    let other = service
        .create_trip(
            "Busan Day Trip".to_string(),
            parse_date("2024-06-01"),
            parse_date("2024-06-01"),
            vec![draft("Dana", true)],
        )
        .await?;
    let dana = other.participants[0].id;

    let err = service
        .remove_participant(trip.trip_id, dana)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ParticipantNotInTrip { .. }));

    Ok(())
}

#[tokio::test]
async fn test_removed_participant_stays_in_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let removed = service.remove_participant(trip.trip_id, trip.ben).await?;
    assert_eq!(removed.name, "Ben");

    let snapshot = service.get_trip(trip.trip_id).await?;
    assert_eq!(snapshot.participants.len(), 3);
    assert_eq!(snapshot.active_participants().count(), 2);

    let ben = snapshot.participant(trip.ben).unwrap();
    assert!(!ben.active);

    Ok(())
}

#[tokio::test]
async fn test_added_participant_is_never_owner() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    // The owner flag on the draft is ignored after creation.
    let dana = service
        .add_participant(trip.trip_id, draft("Dana", true))
        .await?;
    assert!(!dana.is_owner);
    assert!(dana.active);
    assert!(dana.id > trip.chae);

    let snapshot = service.get_trip(trip.trip_id).await?;
    assert_eq!(snapshot.active_participants().count(), 4);
    assert_eq!(snapshot.owner().unwrap().name, "Ana");

    Ok(())
}

#[tokio::test]
async fn test_list_trips_hides_deleted() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let first = StandardTrip::create(&service).await?;
    let second = service
        .create_trip(
            "Busan Day Trip".to_string(),
            parse_date("2024-06-01"),
            parse_date("2024-06-01"),
            vec![draft("Ana", true)],
        )
        .await?;

    // Most recently created first.
    let trips = service.list_trips().await?;
    assert_eq!(trips.len(), 2);
    assert_eq!(trips[0].id, second.trip.id);
    assert_eq!(trips[1].id, first.trip_id);

    service.delete_trip(first.trip_id).await?;

    let trips = service.list_trips().await?;
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].id, second.trip.id);

    // The deleted trip still loads by id, flagged inactive.
    let snapshot = service.get_trip(first.trip_id).await?;
    assert!(!snapshot.trip.active);

    Ok(())
}

#[tokio::test]
async fn test_update_trip_dates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    // Fixture expense lands on 2024-05-02.
    trip.expense_paid_by(&service, "Lunch", trip.ana, 30_000, &[trip.ana, trip.ben])
        .await?;

    let err = service
        .update_trip_dates(trip.trip_id, parse_date("2024-05-05"), parse_date("2024-05-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidDateRange { .. }));

    // Shrinking past the expense date is rejected.
    let err = service
        .update_trip_dates(trip.trip_id, parse_date("2024-05-03"), parse_date("2024-05-05"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ExpenseOutsideTripDates { .. }));

    let updated = service
        .update_trip_dates(trip.trip_id, parse_date("2024-04-30"), parse_date("2024-05-06"))
        .await?;
    assert_eq!(updated.start_date, parse_date("2024-04-30"));

    let snapshot = service.get_trip(trip.trip_id).await?;
    assert_eq!(snapshot.trip.start_date, parse_date("2024-04-30"));
    assert_eq!(snapshot.trip.end_date, parse_date("2024-05-06"));

    Ok(())
}

#[tokio::test]
async fn test_deleted_expense_does_not_block_date_change() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = StandardTrip::create(&service).await?;

    let lunch = trip
        .expense_paid_by(&service, "Lunch", trip.ana, 30_000, &[trip.ana, trip.ben])
        .await?;
    service.delete_expense(lunch.id).await?;

    // The only expense on 2024-05-02 is gone, so the range may shrink past it.
    service
        .update_trip_dates(trip.trip_id, parse_date("2024-05-03"), parse_date("2024-05-05"))
        .await?;

    Ok(())
}
