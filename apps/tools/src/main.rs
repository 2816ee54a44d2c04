use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use server_api::{
    add_menu_item, book_reservation, cancel_reservation, list_menu, list_reservations, ApiContext,
};
use shared::{
    domain::{parse_date, parse_time, DATE_FORMAT, TIME_FORMAT},
    error::ApiException,
    protocol::{BookReservationRequest, MenuAddOutcome},
};
use storage::{Storage, StorageConfig, DEFAULT_MENU_PATH, DEFAULT_RESERVATION_PATH};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = DEFAULT_MENU_PATH)]
    menu_path: PathBuf,
    #[arg(long, default_value = DEFAULT_RESERVATION_PATH)]
    reservation_path: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    ListMenu,
    AddItem {
        item: String,
        price: Decimal,
    },
    ListReservations,
    Book {
        name: String,
        guests: i64,
        /// YYYY-MM-DD
        date: String,
        /// HH:MM
        time: String,
    },
    Cancel {
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = Storage::new(StorageConfig {
        menu_path: cli.menu_path,
        reservation_path: cli.reservation_path,
    })
    .await?;
    let ctx = ApiContext::new(storage);

    match cli.command {
        Command::ListMenu => {
            let menu = list_menu(&ctx).await.map_err(ApiException::from)?;
            if menu.is_empty() {
                println!("menu is empty");
            }
            for entry in menu {
                println!("{}\t{:.2}", entry.item, entry.price.round_dp(2));
            }
        }
        Command::AddItem { item, price } => {
            match add_menu_item(&ctx, &item, price)
                .await
                .map_err(ApiException::from)?
            {
                MenuAddOutcome::Added { item } => println!("added {}", item.item),
                MenuAddOutcome::Skipped { reason } => println!("skipped: {reason:?}"),
            }
        }
        Command::ListReservations => {
            let reservations = list_reservations(&ctx).await.map_err(ApiException::from)?;
            if reservations.is_empty() {
                println!("no reservations");
            }
            for r in reservations {
                println!(
                    "{}\t{}\t{}\t{}",
                    r.name,
                    r.guests,
                    r.date.format(DATE_FORMAT),
                    r.time.format(TIME_FORMAT)
                );
            }
        }
        Command::Book {
            name,
            guests,
            date,
            time,
        } => {
            let date = parse_date(&date).ok_or_else(|| anyhow!("invalid date '{date}'"))?;
            let time = parse_time(&time).ok_or_else(|| anyhow!("invalid time '{time}'"))?;
            let reservation = book_reservation(
                &ctx,
                BookReservationRequest {
                    name,
                    guests,
                    date,
                    time,
                },
            )
            .await
            .map_err(ApiException::from)?;
            println!(
                "booked {} for {} on {} at {}",
                reservation.name,
                reservation.guests,
                reservation.date.format(DATE_FORMAT),
                reservation.time.format(TIME_FORMAT)
            );
        }
        Command::Cancel { name } => {
            let outcome = cancel_reservation(&ctx, &name)
                .await
                .map_err(ApiException::from)?;
            println!(
                "cancelled {} reservation(s) for {}",
                outcome.removed.len(),
                outcome.name
            );
        }
    }

    Ok(())
}
