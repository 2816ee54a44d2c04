use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use shared::domain::{MenuItem, Reservation};
use storage::{Storage, StorageConfig, StoreKind};

#[tokio::test]
async fn stores_are_independent_and_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StorageConfig {
        menu_path: dir.path().join("menus").join("dinner.csv"),
        reservation_path: dir.path().join("bookings.csv"),
    };

    let storage = Storage::new(config.clone()).await.expect("storage");
    storage
        .save_menu(&[MenuItem::new(
            "Pasta",
            Decimal::from_str("12.50").expect("price"),
        )])
        .await
        .expect("save menu");
    storage
        .save_reservations(&[Reservation::new(
            "Alice",
            4,
            NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
            NaiveTime::from_hms_opt(19, 0, 0).expect("time"),
        )])
        .await
        .expect("save reservations");
    drop(storage);

    let reopened = Storage::new(config).await.expect("reopen");
    let menu = reopened.load_menu().await.expect("menu");
    assert_eq!(menu.len(), 1);
    assert_eq!(menu[0].item, "Pasta");

    let reservations = reopened.load_reservations().await.expect("reservations");
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0].name, "Alice");
    assert_eq!(reservations[0].guests, 4);

    let raw = std::fs::read_to_string(reopened.config().path_for(StoreKind::Menu)).expect("raw");
    assert!(raw.starts_with("Item,Price\n"));
}
