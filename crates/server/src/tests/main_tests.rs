use super::*;
use axum::{body, body::Body, http::Request};
use storage::StorageConfig;
use tower::ServiceExt;

async fn test_app() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = Storage::new(StorageConfig::in_dir(dir.path()))
        .await
        .expect("storage");
    let app = build_router(Arc::new(AppState {
        api: ApiContext::new(storage),
    }));
    (app, dir)
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn json_post(uri: &str, value: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(value.to_string()))
        .expect("request")
}

async fn body_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

#[tokio::test]
async fn healthz_reports_ok_when_stores_load() {
    let (app, _dir) = test_app().await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn index_shows_empty_states_and_creates_files() {
    let (app, dir) = test_app().await;
    let request = Request::get("/").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Menu &amp; Reservation Manager"));
    assert!(html.contains("Menu is empty. Add items from the sidebar."));
    assert!(html.contains("No reservations yet."));
    assert!(dir.path().join("menu.csv").exists());
    assert!(dir.path().join("reservations.csv").exists());
}

#[tokio::test]
async fn menu_form_adds_item_and_rerenders() {
    let (app, dir) = test_app().await;
    let response = app
        .oneshot(form_post("/menu", "item=Pasta&price=12.50"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Added Pasta!"));
    assert!(html.contains("<td>Pasta</td><td>12.50</td>"));

    let raw = std::fs::read_to_string(dir.path().join("menu.csv")).expect("menu");
    assert_eq!(raw, "Item,Price\nPasta,12.50\n");
}

#[tokio::test]
async fn menu_form_with_zero_price_does_nothing_visible() {
    let (app, dir) = test_app().await;
    let response = app
        .oneshot(form_post("/menu", "item=Water&price=0.00"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(!html.contains("Added Water"));
    assert!(!html.contains("notice error"));
    assert!(html.contains("Menu is empty."));
    let raw = std::fs::read_to_string(dir.path().join("menu.csv")).expect("menu");
    assert_eq!(raw, "Item,Price\n");
}

#[tokio::test]
async fn menu_form_rejects_non_numeric_price() {
    let (app, _dir) = test_app().await;
    let response = app
        .oneshot(form_post("/menu", "item=Pasta&price=cheap"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Price must be a number."));
}

#[tokio::test]
async fn booking_form_requires_a_name() {
    let (app, dir) = test_app().await;
    let response = app
        .oneshot(form_post(
            "/reservations",
            "name=&guests=2&date=2024-05-01&time=19%3A00",
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Name is required."));

    let raw = std::fs::read_to_string(dir.path().join("reservations.csv")).expect("file");
    assert_eq!(raw, "Name,Guests,Date,Time\n");
}

#[tokio::test]
async fn booking_then_cancelling_through_the_form() {
    let (app, dir) = test_app().await;
    for body in [
        "name=Alice&guests=4&date=2024-05-01&time=19%3A00",
        "name=Alice&guests=2&date=2024-05-02&time=20%3A00",
    ] {
        let response = app
            .clone()
            .oneshot(form_post("/reservations", body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Reservation booked for Alice!"));
    }

    let raw = std::fs::read_to_string(dir.path().join("reservations.csv")).expect("file");
    assert_eq!(
        raw,
        "Name,Guests,Date,Time\nAlice,4,2024-05-01,19:00\nAlice,2,2024-05-02,20:00\n"
    );

    let response = app
        .oneshot(form_post("/reservations/cancel", "name=Alice"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Reservation for Alice cancelled."));
    assert!(html.contains("No reservations yet."));
}

#[tokio::test]
async fn api_book_list_and_cancel() {
    let (app, _dir) = test_app().await;
    let booking = json_post(
        "/api/reservations",
        serde_json::json!({
            "name": "Bob",
            "guests": 3,
            "date": "2024-06-10",
            "time": "12:30"
        }),
    );
    let response = app.clone().oneshot(booking).await.expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let booked: Reservation = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(booked.name, "Bob");
    assert_eq!(booked.guests, 3);

    let list = Request::get("/api/reservations")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(list).await.expect("response");
    let reservations: Vec<Reservation> =
        serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(reservations, vec![booked]);

    let cancel = json_post(
        "/api/reservations/cancel",
        serde_json::json!({ "name": "Bob" }),
    );
    let response = app.oneshot(cancel).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: CancelOutcome = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(outcome.removed.len(), 1);
}

#[tokio::test]
async fn api_validation_errors_are_bad_requests() {
    let (app, _dir) = test_app().await;
    let booking = json_post(
        "/api/reservations",
        serde_json::json!({
            "name": "",
            "guests": 3,
            "date": "2024-06-10",
            "time": "12:30"
        }),
    );
    let response = app.oneshot(booking).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = serde_json::from_str(&body_text(response).await).expect("json");
    assert!(matches!(err.code, ErrorCode::Validation));
}

#[tokio::test]
async fn api_reports_skipped_zero_price() {
    let (app, _dir) = test_app().await;
    let add = json_post(
        "/api/menu",
        serde_json::json!({ "item": "Water", "price": "0" }),
    );
    let response = app.oneshot(add).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let value: serde_json::Value =
        serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(value["status"], "skipped");
    assert_eq!(value["reason"], "zero_price");
}

#[tokio::test]
async fn corrupt_store_halts_the_page() {
    let (app, dir) = test_app().await;
    std::fs::write(dir.path().join("menu.csv"), "Item,Price\nPasta\n").expect("write");
    let request = Request::get("/").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("malformed row"));
}

#[test]
fn blank_form_fields_fall_back_to_widget_defaults() {
    assert_eq!(parse_price(""), Some(Decimal::ZERO));
    let request = booking_request(BookingForm {
        name: "Eve".into(),
        guests: String::new(),
        date: "2024-05-01".into(),
        time: "19:00:00".into(),
    })
    .expect("request");
    assert_eq!(request.guests, 1);
    assert_eq!(request.time.format("%H:%M").to_string(), "19:00");
}
