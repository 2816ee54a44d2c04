use std::sync::Arc;

use rust_decimal::Decimal;
use shared::{
    domain::{MenuItem, Reservation},
    error::{ApiError, ErrorCode},
    protocol::{BookReservationRequest, CancelOutcome, MenuAddOutcome, SkipReason},
};
use storage::{Storage, StorageError};
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    /// Serializes read-modify-write cycles issued through this context.
    write_gate: Arc<Mutex<()>>,
}

impl ApiContext {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            write_gate: Arc::new(Mutex::new(())),
        }
    }
}

pub async fn list_menu(ctx: &ApiContext) -> Result<Vec<MenuItem>, ApiError> {
    ctx.storage.load_menu().await.map_err(internal)
}

pub async fn add_menu_item(
    ctx: &ApiContext,
    item: &str,
    price: Decimal,
) -> Result<MenuAddOutcome, ApiError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ApiError::validation("Price cannot be negative."));
    }
    if item.is_empty() {
        return Ok(MenuAddOutcome::Skipped {
            reason: SkipReason::EmptyItem,
        });
    }
    if price.is_zero() {
        info!(item, "ignoring menu item with zero price");
        return Ok(MenuAddOutcome::Skipped {
            reason: SkipReason::ZeroPrice,
        });
    }

    let _guard = ctx.write_gate.lock().await;
    let mut menu = ctx.storage.load_menu().await.map_err(internal)?;
    let added = MenuItem::new(item, price);
    menu.push(added.clone());
    ctx.storage.save_menu(&menu).await.map_err(internal)?;
    info!(item, %price, "added menu item");
    Ok(MenuAddOutcome::Added { item: added })
}

pub async fn list_reservations(ctx: &ApiContext) -> Result<Vec<Reservation>, ApiError> {
    ctx.storage.load_reservations().await.map_err(internal)
}

/// Names that can be cancelled, each once, in order of first booking.
pub async fn reservation_names(ctx: &ApiContext) -> Result<Vec<String>, ApiError> {
    let reservations = list_reservations(ctx).await?;
    Ok(distinct_names(&reservations))
}

pub fn distinct_names(reservations: &[Reservation]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for reservation in reservations {
        if !names.contains(&reservation.name) {
            names.push(reservation.name.clone());
        }
    }
    names
}

pub async fn book_reservation(
    ctx: &ApiContext,
    request: BookReservationRequest,
) -> Result<Reservation, ApiError> {
    if request.name.is_empty() {
        return Err(ApiError::validation("Name is required."));
    }
    let reservation = Reservation::new(request.name, request.guests, request.date, request.time);

    let _guard = ctx.write_gate.lock().await;
    let mut reservations = ctx.storage.load_reservations().await.map_err(internal)?;
    reservations.push(reservation.clone());
    ctx.storage
        .save_reservations(&reservations)
        .await
        .map_err(internal)?;
    info!(
        name = %reservation.name,
        guests = reservation.guests,
        date = %reservation.date,
        time = %reservation.time.format(shared::domain::TIME_FORMAT),
        "booked reservation"
    );
    Ok(reservation)
}

/// Removes every reservation booked under exactly `name`.
pub async fn cancel_reservation(ctx: &ApiContext, name: &str) -> Result<CancelOutcome, ApiError> {
    let _guard = ctx.write_gate.lock().await;
    let reservations = ctx.storage.load_reservations().await.map_err(internal)?;
    let (removed, kept): (Vec<_>, Vec<_>) = reservations
        .into_iter()
        .partition(|reservation| reservation.name == name);

    if removed.is_empty() {
        info!(name, "no reservations to cancel");
    } else {
        ctx.storage
            .save_reservations(&kept)
            .await
            .map_err(internal)?;
        for reservation in &removed {
            info!(
                name = %reservation.name,
                guests = reservation.guests,
                date = %reservation.date,
                time = %reservation.time.format(shared::domain::TIME_FORMAT),
                "cancelled reservation"
            );
        }
    }

    Ok(CancelOutcome {
        name: name.to_string(),
        removed,
    })
}

fn internal(err: StorageError) -> ApiError {
    error!(error = %err, "store access failed");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
