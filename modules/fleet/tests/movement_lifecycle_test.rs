//! Movement lifecycle against the in-memory store
//!
//! Amounts are minor units; the low-credit threshold is 5000.00 (500_000).

mod common;

use chrono::NaiveDate;
use common::{day, refuel, TestApp};
use fleet_rs::models::{AdjustmentReason, MovementFilter};
use fleet_rs::services::movement_service::{self, MovementError};
use fleet_rs::services::report_service::{self, ReportRange};
use fleet_rs::services::station_service::{self, StationError};
use fleet_rs::validation::{StationDraft, ValidationError};

async fn all_movements(app: &TestApp) -> Vec<fleet_rs::models::Movement> {
    movement_service::list_movements(&app.ctx, &MovementFilter::default(), None, 1)
        .await
        .unwrap()
        .data
}

#[tokio::test]
async fn test_charge_above_threshold_is_silent() {
    let app = TestApp::new();
    let station = app.seed_station("North", Some(600_000)).await;
    let vehicle = app.seed_vehicle("daily", 1_000).await;

    let movement = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 80_000, (1_000, 1_400)),
    )
    .await
    .unwrap();

    assert_eq!(movement.station_charge_minor, 80_000);
    assert_eq!(app.balance(station.id).await, Some(520_000));
    assert!(app.credit.is_empty());
    assert_eq!(app.refuels.len(), 1);
    assert!(app.refuels.messages()[0].contains("New refuel"));
}

#[tokio::test]
async fn test_crossing_threshold_fires_one_low_credit() {
    let app = TestApp::new();
    let station = app.seed_station("North", Some(520_000)).await;
    let vehicle = app.seed_vehicle("daily", 1_000).await;

    movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 80_000, (1_000, 1_400)),
    )
    .await
    .unwrap();

    assert_eq!(app.balance(station.id).await, Some(440_000));
    assert_eq!(app.credit.len(), 1);
    assert!(app.credit.messages()[0].contains("Station credit low"));
}

#[tokio::test]
async fn test_staying_below_threshold_alerts_once() {
    let app = TestApp::new();
    let station = app.seed_station("North", Some(520_000)).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    for i in 0..3 {
        movement_service::create_movement(
            &app.ctx,
            "mario",
            refuel(vehicle.id, Some(station.id), 80_000, (i * 100, i * 100 + 100)),
        )
        .await
        .unwrap();
    }

    assert_eq!(app.balance(station.id).await, Some(280_000));
    assert_eq!(app.credit.len(), 1);
}

#[tokio::test]
async fn test_insufficient_credit_persists_nothing() {
    let app = TestApp::new();
    let station = app.seed_station("South", Some(10_000)).await;
    let vehicle = app.seed_vehicle("daily", 1_000).await;

    let err = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 50_000, (1_000, 1_400)),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        MovementError::InsufficientCredit {
            available: 10_000,
            requested: 50_000,
            ..
        }
    ));
    assert_eq!(app.balance(station.id).await, Some(10_000));
    assert!(all_movements(&app).await.is_empty());
    assert_eq!(app.current_km(vehicle.id).await, 1_000);
    assert!(app.store().list_adjustments(station.id).await.unwrap().is_empty());
    assert!(app.refuels.is_empty());
    assert_eq!(app.ctx.metrics.credit_rejections_total.get(), 1);
}

#[tokio::test]
async fn test_untracked_station_never_charged() {
    let app = TestApp::new();
    let station = app.seed_station("Roadside", None).await;
    let vehicle = app.seed_vehicle("daily", 1_000).await;

    let movement = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 50_000, (1_000, 1_400)),
    )
    .await
    .unwrap();

    assert_eq!(movement.station_charge_minor, 0);
    assert_eq!(app.balance(station.id).await, None);
    assert!(app.store().list_adjustments(station.id).await.unwrap().is_empty());
    assert!(app.credit.is_empty());
}

#[tokio::test]
async fn test_refuel_without_station() {
    let app = TestApp::new();
    let vehicle = app.seed_vehicle("daily", 1_000).await;

    let movement = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, None, 50_000, (1_000, 1_400)),
    )
    .await
    .unwrap();

    assert_eq!(movement.station_charge_minor, 0);
    assert_eq!(app.current_km(vehicle.id).await, 1_400);
}

#[tokio::test]
async fn test_create_sets_odometer_and_efficiency() {
    let app = TestApp::new();
    let vehicle = app.seed_vehicle("daily", 100).await;

    let mut draft = refuel(vehicle.id, None, 20_000, (100, 150));
    draft.liters_centi = 1_000;
    let movement = movement_service::create_movement(&app.ctx, "mario", draft)
        .await
        .unwrap();
    assert_eq!(movement.km_per_liter, Some(5.0));
    assert_eq!(app.current_km(vehicle.id).await, 150);

    let backwards = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, None, 20_000, (150, 120)),
    )
    .await
    .unwrap();
    assert_eq!(backwards.km_per_liter, None);
}

#[tokio::test]
async fn test_unknown_references_rejected() {
    let app = TestApp::new();
    let vehicle = app.seed_vehicle("daily", 0).await;

    let err = movement_service::create_movement(&app.ctx, "mario", refuel(999, None, 20_000, (0, 10)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MovementError::Validation(ValidationError::UnknownReference { field: "vehicle_id", id: 999 })
    ));

    let err = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(42), 20_000, (0, 10)),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        MovementError::Validation(ValidationError::UnknownReference { field: "station_id", id: 42 })
    ));
}

#[tokio::test]
async fn test_edit_moves_charge_between_stations() {
    let app = TestApp::new();
    let a = app.seed_station("A", Some(100_000)).await;
    let b = app.seed_station("B", Some(200_000)).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    let movement = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(a.id), 30_000, (0, 300)),
    )
    .await
    .unwrap();
    assert_eq!(app.balance(a.id).await, Some(70_000));

    let updated = movement_service::update_movement(
        &app.ctx,
        movement.id,
        Some("luigi"),
        refuel(vehicle.id, Some(b.id), 40_000, (0, 300)),
    )
    .await
    .unwrap();

    assert_eq!(updated.station_charge_minor, 40_000);
    assert_eq!(updated.author, "mario");
    assert_eq!(updated.updated_by.as_deref(), Some("luigi"));
    assert_eq!(app.balance(a.id).await, Some(100_000));
    assert_eq!(app.balance(b.id).await, Some(160_000));

    let a_journal = app.store().list_adjustments(a.id).await.unwrap();
    assert_eq!(a_journal.last().unwrap().reason, AdjustmentReason::MovementRelease);
    assert_eq!(a_journal.last().unwrap().delta_minor, 30_000);

    let b_journal = app.store().list_adjustments(b.id).await.unwrap();
    assert_eq!(b_journal.len(), 1);
    assert_eq!(b_journal[0].delta_minor, -40_000);

    // A went up, B stayed below the threshold it was already under
    assert_eq!(app.credit.len(), 1);
    assert!(app.credit.messages()[0].contains("topped up"));
}

#[tokio::test]
async fn test_edit_same_station_nets_one_delta() {
    let app = TestApp::new();
    let station = app.seed_station("A", Some(100_000)).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    let movement = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 30_000, (0, 300)),
    )
    .await
    .unwrap();

    movement_service::update_movement(
        &app.ctx,
        movement.id,
        None,
        refuel(vehicle.id, Some(station.id), 40_000, (0, 300)),
    )
    .await
    .unwrap();

    assert_eq!(app.balance(station.id).await, Some(60_000));
    let journal = app.store().list_adjustments(station.id).await.unwrap();
    assert_eq!(journal.len(), 2);
    assert_eq!(journal[1].reason, AdjustmentReason::MovementReconcile);
    assert_eq!(journal[1].delta_minor, -10_000);
}

#[tokio::test]
async fn test_edit_can_use_released_charge() {
    let app = TestApp::new();
    let station = app.seed_station("A", Some(100_000)).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    let movement = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 30_000, (0, 300)),
    )
    .await
    .unwrap();

    // 70_000 left plus the 30_000 being released
    movement_service::update_movement(
        &app.ctx,
        movement.id,
        None,
        refuel(vehicle.id, Some(station.id), 100_000, (0, 300)),
    )
    .await
    .unwrap();

    assert_eq!(app.balance(station.id).await, Some(0));
}

#[tokio::test]
async fn test_edit_without_amount_change_writes_no_adjustment() {
    let app = TestApp::new();
    let station = app.seed_station("A", Some(600_000)).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    let movement = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 30_000, (0, 300)),
    )
    .await
    .unwrap();

    let mut draft = refuel(vehicle.id, Some(station.id), 30_000, (0, 350));
    draft.notes = Some("fixed odometer".to_string());
    movement_service::update_movement(&app.ctx, movement.id, None, draft)
        .await
        .unwrap();

    assert_eq!(app.balance(station.id).await, Some(570_000));
    assert_eq!(app.store().list_adjustments(station.id).await.unwrap().len(), 1);
    assert!(app.credit.is_empty());
    assert_eq!(app.current_km(vehicle.id).await, 350);
}

#[tokio::test]
async fn test_rejected_edit_leaves_state_untouched() {
    let app = TestApp::new();
    let a = app.seed_station("A", Some(100_000)).await;
    let b = app.seed_station("B", Some(10_000)).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    let movement = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(a.id), 30_000, (0, 300)),
    )
    .await
    .unwrap();

    let err = movement_service::update_movement(
        &app.ctx,
        movement.id,
        None,
        refuel(vehicle.id, Some(b.id), 40_000, (0, 300)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, MovementError::InsufficientCredit { available: 10_000, .. }));
    assert_eq!(app.balance(a.id).await, Some(70_000));
    assert_eq!(app.balance(b.id).await, Some(10_000));
    let stored = movement_service::get_movement(&app.ctx, movement.id).await.unwrap();
    assert_eq!(stored.station_id, Some(a.id));
}

#[tokio::test]
async fn test_update_unknown_movement() {
    let app = TestApp::new();
    let vehicle = app.seed_vehicle("daily", 0).await;

    let err = movement_service::update_movement(&app.ctx, 77, None, refuel(vehicle.id, None, 20_000, (0, 10)))
        .await
        .unwrap_err();
    assert!(matches!(err, MovementError::NotFound(77)));
}

#[tokio::test]
async fn test_delete_releases_charge() {
    let app = TestApp::new();
    let station = app.seed_station("C", Some(100_000)).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    let movement = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 25_000, (0, 300)),
    )
    .await
    .unwrap();
    assert_eq!(app.balance(station.id).await, Some(75_000));

    movement_service::delete_movement(&app.ctx, movement.id)
        .await
        .unwrap();

    assert_eq!(app.balance(station.id).await, Some(100_000));
    let journal = app.store().list_adjustments(station.id).await.unwrap();
    assert_eq!(journal.last().unwrap().reason, AdjustmentReason::MovementRelease);
    assert_eq!(journal.last().unwrap().movement_id, Some(movement.id));
    assert!(app.credit.messages().iter().any(|m| m.contains("topped up")));
}

#[tokio::test]
async fn test_delete_resyncs_odometer_to_latest_remaining() {
    let app = TestApp::new();
    let vehicle = app.seed_vehicle("daily", 1_000).await;

    let mut early = refuel(vehicle.id, None, 20_000, (1_000, 1_200));
    early.date = day(2026, 3, 2);
    let early = movement_service::create_movement(&app.ctx, "mario", early).await.unwrap();

    let mut late = refuel(vehicle.id, None, 20_000, (1_200, 1_500));
    late.date = day(2026, 3, 5);
    let late = movement_service::create_movement(&app.ctx, "mario", late).await.unwrap();

    // same date as `early`, higher id
    let mut same_day = refuel(vehicle.id, None, 20_000, (1_200, 1_300));
    same_day.date = day(2026, 3, 2);
    let same_day = movement_service::create_movement(&app.ctx, "mario", same_day)
        .await
        .unwrap();

    movement_service::delete_movement(&app.ctx, late.id).await.unwrap();
    assert_eq!(app.current_km(vehicle.id).await, 1_300);

    movement_service::delete_movement(&app.ctx, same_day.id).await.unwrap();
    assert_eq!(app.current_km(vehicle.id).await, 1_200);

    movement_service::delete_movement(&app.ctx, early.id).await.unwrap();
    assert_eq!(app.current_km(vehicle.id).await, 1_000);
}

#[tokio::test]
async fn test_bulk_delete_is_all_or_nothing() {
    let app = TestApp::new();
    let station = app.seed_station("C", Some(100_000)).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    let first = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 10_000, (0, 100)),
    )
    .await
    .unwrap();
    let second = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 20_000, (100, 200)),
    )
    .await
    .unwrap();

    let err = movement_service::delete_movements(&app.ctx, &[first.id, 9_999])
        .await
        .unwrap_err();
    assert!(matches!(err, MovementError::NotFound(9_999)));
    assert_eq!(all_movements(&app).await.len(), 2);
    assert_eq!(app.balance(station.id).await, Some(70_000));

    let deleted = movement_service::delete_movements(&app.ctx, &[first.id, second.id])
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert!(all_movements(&app).await.is_empty());
    assert_eq!(app.balance(station.id).await, Some(100_000));
    assert_eq!(app.current_km(vehicle.id).await, 0);
}

#[tokio::test]
async fn test_balance_conserved_across_operations() {
    let app = TestApp::new();
    let initial = 1_000_000;
    let station = app.seed_station("Hub", Some(initial)).await;
    let other = app.seed_station("Other", Some(initial)).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    let mut ids = Vec::new();
    for (i, price) in [12_000, 34_500, 8_750, 60_000].into_iter().enumerate() {
        let km = i as i64 * 100;
        let m = movement_service::create_movement(
            &app.ctx,
            "mario",
            refuel(vehicle.id, Some(station.id), price, (km, km + 100)),
        )
        .await
        .unwrap();
        ids.push(m.id);
    }

    movement_service::update_movement(
        &app.ctx,
        ids[1],
        None,
        refuel(vehicle.id, Some(station.id), 20_000, (100, 200)),
    )
    .await
    .unwrap();
    movement_service::update_movement(
        &app.ctx,
        ids[2],
        None,
        refuel(vehicle.id, Some(other.id), 8_750, (200, 300)),
    )
    .await
    .unwrap();
    movement_service::delete_movement(&app.ctx, ids[0]).await.unwrap();

    for s in [&station, &other] {
        let charged: i64 = all_movements(&app)
            .await
            .iter()
            .filter(|m| m.station_id == Some(s.id))
            .map(|m| m.station_charge_minor)
            .sum();
        assert_eq!(app.balance(s.id).await, Some(initial - charged));
    }
}

#[tokio::test]
async fn test_opening_balance_below_threshold_is_silent() {
    let app = TestApp::new();
    let station = station_service::create_station(
        &app.ctx,
        StationDraft {
            name: "Depot".to_string(),
            address: None,
            credit_balance_minor: Some(Some(100_000)),
        },
    )
    .await
    .unwrap();

    assert_eq!(station.credit_balance_minor, Some(100_000));
    assert!(app.credit.is_empty());
    let journal = app.store().list_adjustments(station.id).await.unwrap();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].reason, AdjustmentReason::Opening);
    assert_eq!(journal[0].balance_before_minor, None);
}

#[tokio::test]
async fn test_admin_overwrite_records_single_adjustment() {
    let app = TestApp::new();
    let station = station_service::create_station(
        &app.ctx,
        StationDraft {
            name: "Depot".to_string(),
            address: None,
            credit_balance_minor: Some(Some(600_000)),
        },
    )
    .await
    .unwrap();
    assert!(app.credit.is_empty());

    station_service::update_station(
        &app.ctx,
        station.id,
        StationDraft {
            name: "Depot".to_string(),
            address: None,
            credit_balance_minor: Some(Some(450_000)),
        },
    )
    .await
    .unwrap();

    let journal = app.store().list_adjustments(station.id).await.unwrap();
    assert_eq!(journal.len(), 2);
    assert_eq!(journal[0].reason, AdjustmentReason::Opening);
    assert_eq!(journal[1].reason, AdjustmentReason::AdminOverwrite);
    assert_eq!(journal[1].delta_minor, -150_000);
    assert_eq!(app.credit.len(), 1);
    assert!(app.credit.messages()[0].contains("Station credit low"));
}

#[tokio::test]
async fn test_stop_tracking_is_silent_and_stops_charges() {
    let app = TestApp::new();
    let station = app.seed_station("Depot", Some(600_000)).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    let updated = station_service::update_station(
        &app.ctx,
        station.id,
        StationDraft {
            name: "Depot".to_string(),
            address: None,
            credit_balance_minor: Some(None),
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.credit_balance_minor, None);
    assert!(app.credit.is_empty());

    let movement = movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(station.id), 50_000, (0, 100)),
    )
    .await
    .unwrap();
    assert_eq!(movement.station_charge_minor, 0);
}

#[tokio::test]
async fn test_edit_without_balance_keeps_it() {
    let app = TestApp::new();
    let station = app.seed_station("Depot", Some(600_000)).await;

    let updated = station_service::update_station(
        &app.ctx,
        station.id,
        StationDraft {
            name: "Depot East".to_string(),
            address: Some("Via Roma 1".to_string()),
            credit_balance_minor: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.name, "Depot East");
    assert_eq!(updated.credit_balance_minor, Some(600_000));
    assert!(app.store().list_adjustments(station.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_referenced_station_cannot_be_deleted() {
    let app = TestApp::new();
    let used = app.seed_station("Used", Some(600_000)).await;
    let unused = app.seed_station("Unused", None).await;
    let vehicle = app.seed_vehicle("daily", 0).await;

    movement_service::create_movement(
        &app.ctx,
        "mario",
        refuel(vehicle.id, Some(used.id), 10_000, (0, 100)),
    )
    .await
    .unwrap();

    let err = station_service::delete_station(&app.ctx, used.id).await.unwrap_err();
    assert!(matches!(err, StationError::InUse { movements: 1, .. }));

    station_service::delete_station(&app.ctx, unused.id).await.unwrap();
    assert!(app.store().find_station(unused.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_listing_filters_and_pages() {
    let app = TestApp::new();
    let station = app.seed_station("A", None).await;
    let vehicle = app.seed_vehicle("daily", 0).await;
    let other = app.seed_vehicle("van", 0).await;

    for d in 1..=5 {
        let mut draft = refuel(vehicle.id, Some(station.id), 10_000, (0, 100));
        draft.date = day(2026, 3, d);
        movement_service::create_movement(&app.ctx, "mario", draft).await.unwrap();
    }
    movement_service::create_movement(&app.ctx, "anna", refuel(other.id, None, 10_000, (0, 100)))
        .await
        .unwrap();

    let filter = MovementFilter {
        vehicle_id: Some(vehicle.id),
        ..Default::default()
    };
    let page = movement_service::list_movements(&app.ctx, &filter, Some(2), 2)
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.last_page, 3);
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].date, day(2026, 3, 3));

    let by_author = MovementFilter {
        author: Some("anna".to_string()),
        ..Default::default()
    };
    let all = movement_service::list_movements(&app.ctx, &by_author, None, 1)
        .await
        .unwrap();
    assert_eq!(all.total, 1);
    assert_eq!(all.per_page, None);
}

#[tokio::test]
async fn test_listing_extreme_pages() {
    let app = TestApp::new();
    let vehicle = app.seed_vehicle("daily", 0).await;
    movement_service::create_movement(&app.ctx, "mario", refuel(vehicle.id, None, 20_000, (0, 400)))
        .await
        .unwrap();

    let filter = MovementFilter::default();
    let far = movement_service::list_movements(&app.ctx, &filter, Some(20), i64::MAX)
        .await
        .unwrap();
    assert_eq!(far.total, 1);
    assert!(far.data.is_empty());
    assert_eq!(far.last_page, 1);

    let wide = movement_service::list_movements(&app.ctx, &filter, Some(i64::MAX), 1)
        .await
        .unwrap();
    assert_eq!(wide.data.len(), 1);
    assert_eq!(wide.last_page, 1);
}

#[tokio::test]
async fn test_refuel_report_totals_saturate() {
    let app = TestApp::new();
    let vehicle = app.seed_vehicle("daily", 0).await;
    let huge = i64::MAX / 2 + 10;
    movement_service::create_movement(&app.ctx, "mario", refuel(vehicle.id, None, huge, (0, 400)))
        .await
        .unwrap();
    movement_service::create_movement(&app.ctx, "mario", refuel(vehicle.id, None, huge, (400, 800)))
        .await
        .unwrap();

    let range = ReportRange {
        start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    };
    let report = report_service::refuel_report(&app.ctx, range).await.unwrap();
    assert_eq!(report.totals.refuel_count, 2);
    assert_eq!(report.totals.spent_minor, i64::MAX);
    assert_eq!(report.by_vehicle[0].spent_minor, i64::MAX);
}
