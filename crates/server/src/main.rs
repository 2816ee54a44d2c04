use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Local;
use rust_decimal::Decimal;
use serde::Deserialize;
use server_api::{
    add_menu_item, book_reservation, cancel_reservation, distinct_names, list_menu,
    list_reservations, ApiContext,
};
use shared::{
    domain::{parse_date, parse_time, MenuItem, Reservation, MIN_GUESTS},
    error::{ApiError, ErrorCode},
    protocol::{
        AddMenuItemRequest, BookReservationRequest, CancelOutcome, CancelReservationRequest,
        MenuAddOutcome,
    },
};
use storage::Storage;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod page;

use app_state::AppState;
use config::load_settings;
use page::{Notice, PageModel, Section};

const MAX_FORM_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct MenuForm {
    #[serde(default)]
    item: String,
    #[serde(default)]
    price: String,
}

#[derive(Debug, Deserialize)]
struct BookingForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    guests: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    time: String,
}

#[derive(Debug, Deserialize)]
struct CancelForm {
    #[serde(default)]
    name: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let storage = Storage::new(settings.storage_config())
        .await
        .map_err(|error| {
            error!(
                menu_path = %settings.menu_path.display(),
                reservation_path = %settings.reservation_path.display(),
                %error,
                "failed to prepare data directories; verify the paths and permissions"
            );
            error
        })?;
    if let Err(error) = storage.health_check().await {
        warn!(%error, "store files could not be loaded; pages will report the failure");
    }

    let state = AppState {
        api: ApiContext::new(storage),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/menu", post(submit_menu_item))
        .route("/reservations", post(submit_booking))
        .route("/reservations/cancel", post(submit_cancellation))
        .route("/api/menu", get(api_list_menu).post(api_add_menu_item))
        .route(
            "/api/reservations",
            get(api_list_reservations).post(api_book_reservation),
        )
        .route("/api/reservations/cancel", post(api_cancel_reservation))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> ApiResult<&'static str> {
    state.api.storage.health_check().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    render(&state, StatusCode::OK, None).await
}

async fn submit_menu_item(
    State(state): State<Arc<AppState>>,
    Form(form): Form<MenuForm>,
) -> Response {
    let Some(price) = parse_price(&form.price) else {
        let notice = Notice::error(Section::Menu, "Price must be a number.");
        return render(&state, StatusCode::UNPROCESSABLE_ENTITY, Some(notice)).await;
    };

    match add_menu_item(&state.api, &form.item, price).await {
        Ok(MenuAddOutcome::Added { item }) => {
            let notice = Notice::success(Section::Menu, format!("Added {}!", item.item));
            render(&state, StatusCode::OK, Some(notice)).await
        }
        Ok(MenuAddOutcome::Skipped { .. }) => render(&state, StatusCode::OK, None).await,
        Err(err) => render_failure(&state, Section::Menu, err).await,
    }
}

async fn submit_booking(
    State(state): State<Arc<AppState>>,
    Form(form): Form<BookingForm>,
) -> Response {
    let request = match booking_request(form) {
        Ok(request) => request,
        Err(err) => return render_failure(&state, Section::Booking, err).await,
    };

    match book_reservation(&state.api, request).await {
        Ok(reservation) => {
            let notice = Notice::success(
                Section::Booking,
                format!("Reservation booked for {}!", reservation.name),
            );
            render(&state, StatusCode::OK, Some(notice)).await
        }
        Err(err) => render_failure(&state, Section::Booking, err).await,
    }
}

async fn submit_cancellation(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CancelForm>,
) -> Response {
    match cancel_reservation(&state.api, &form.name).await {
        Ok(outcome) if outcome.removed.is_empty() => {
            let notice = Notice::info(
                Section::Cancel,
                format!("No reservation found for {}.", outcome.name),
            );
            render(&state, StatusCode::OK, Some(notice)).await
        }
        Ok(outcome) => {
            let notice = Notice::success(
                Section::Cancel,
                format!("Reservation for {} cancelled.", outcome.name),
            );
            render(&state, StatusCode::OK, Some(notice)).await
        }
        Err(err) => render_failure(&state, Section::Cancel, err).await,
    }
}

/// One full page pass: both stores are read fresh for every render.
async fn render(state: &AppState, status: StatusCode, notice: Option<Notice>) -> Response {
    let (menu, reservations) = match load_tables(&state.api).await {
        Ok(tables) => tables,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page::render_error_page(&err.message)),
            )
                .into_response()
        }
    };
    let names = distinct_names(&reservations);
    let now = Local::now();
    let model = PageModel {
        menu: &menu,
        reservations: &reservations,
        names: &names,
        notice: notice.as_ref(),
        today: now.date_naive(),
        now: now.time(),
    };
    (status, Html(page::render_page(&model))).into_response()
}

async fn render_failure(state: &AppState, section: Section, err: ApiError) -> Response {
    match err.code {
        ErrorCode::Validation => {
            let notice = Notice::error(section, err.message);
            render(state, StatusCode::UNPROCESSABLE_ENTITY, Some(notice)).await
        }
        ErrorCode::Internal => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(page::render_error_page(&err.message)),
        )
            .into_response(),
    }
}

async fn load_tables(api: &ApiContext) -> Result<(Vec<MenuItem>, Vec<Reservation>), ApiError> {
    let menu = list_menu(api).await?;
    let reservations = list_reservations(api).await?;
    Ok((menu, reservations))
}

/// A blank price field means the input's default of zero.
fn parse_price(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(raw).ok()
}

fn booking_request(form: BookingForm) -> Result<BookReservationRequest, ApiError> {
    let guests = match form.guests.trim() {
        "" => i64::from(MIN_GUESTS),
        raw => raw
            .parse::<i64>()
            .map_err(|_| ApiError::validation("Number of guests must be a whole number."))?,
    };
    if form.date.trim().is_empty() {
        return Err(ApiError::validation("Date is required."));
    }
    let date = parse_date(&form.date)
        .ok_or_else(|| ApiError::validation("Date must be in YYYY-MM-DD form."))?;
    if form.time.trim().is_empty() {
        return Err(ApiError::validation("Time is required."));
    }
    let time =
        parse_time(&form.time).ok_or_else(|| ApiError::validation("Time must be in HH:MM form."))?;

    Ok(BookReservationRequest {
        name: form.name,
        guests,
        date,
        time,
    })
}

fn api_failure(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

async fn api_list_menu(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<MenuItem>>> {
    let menu = list_menu(&state.api).await.map_err(api_failure)?;
    Ok(Json(menu))
}

async fn api_add_menu_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddMenuItemRequest>,
) -> ApiResult<Json<MenuAddOutcome>> {
    let outcome = add_menu_item(&state.api, &req.item, req.price)
        .await
        .map_err(api_failure)?;
    Ok(Json(outcome))
}

async fn api_list_reservations(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Reservation>>> {
    let reservations = list_reservations(&state.api).await.map_err(api_failure)?;
    Ok(Json(reservations))
}

async fn api_book_reservation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookReservationRequest>,
) -> ApiResult<(StatusCode, Json<Reservation>)> {
    let reservation = book_reservation(&state.api, req)
        .await
        .map_err(api_failure)?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

async fn api_cancel_reservation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CancelReservationRequest>,
) -> ApiResult<Json<CancelOutcome>> {
    let outcome = cancel_reservation(&state.api, &req.name)
        .await
        .map_err(api_failure)?;
    Ok(Json(outcome))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
