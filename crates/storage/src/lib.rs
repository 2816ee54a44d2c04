use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{NaiveDate, NaiveTime};
use csv::{ReaderBuilder, WriterBuilder};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::domain::{hhmm, MenuItem, Reservation, MAX_GUESTS, MIN_GUESTS, TIME_FORMAT};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::{fs, task};
use tracing::{debug, info};

pub const DEFAULT_MENU_PATH: &str = "menu.csv";
pub const DEFAULT_RESERVATION_PATH: &str = "reservations.csv";

/// The two tables this crate persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Menu,
    Reservations,
}

impl StoreKind {
    /// Column names written as the first row of the store file.
    pub fn header(self) -> &'static [&'static str] {
        match self {
            StoreKind::Menu => &["Item", "Price"],
            StoreKind::Reservations => &["Name", "Guests", "Date", "Time"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StoreKind::Menu => "menu",
            StoreKind::Reservations => "reservations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub menu_path: PathBuf,
    pub reservation_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            menu_path: PathBuf::from(DEFAULT_MENU_PATH),
            reservation_path: PathBuf::from(DEFAULT_RESERVATION_PATH),
        }
    }
}

impl StorageConfig {
    /// Default file names placed under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            menu_path: dir.join(DEFAULT_MENU_PATH),
            reservation_path: dir.join(DEFAULT_RESERVATION_PATH),
        }
    }

    pub fn path_for(&self, kind: StoreKind) -> &Path {
        match kind {
            StoreKind::Menu => &self.menu_path,
            StoreKind::Reservations => &self.reservation_path,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to {action} '{}': {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{}' has columns {found:?}, expected {expected:?}", .path.display())]
    Schema {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("malformed row in '{}': {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid record on line {line} of '{}': {reason}", .path.display())]
    InvalidRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("failed to encode '{}': {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

/// Whole-table repository over the menu and reservation files.
///
/// Nothing is cached: every load reads the file again, every save rewrites
/// it in full. Writers in other processes are not coordinated with.
#[derive(Debug, Clone)]
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    pub async fn new(config: StorageConfig) -> Result<Self> {
        for kind in [StoreKind::Menu, StoreKind::Reservations] {
            ensure_parent_dir_exists(config.path_for(kind)).await?;
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub async fn health_check(&self) -> Result<()> {
        self.load_menu().await?;
        self.load_reservations().await?;
        Ok(())
    }

    pub async fn load_menu(&self) -> Result<Vec<MenuItem>> {
        let rows: Vec<MenuRow> = self.load_table().await?;
        Ok(rows.into_iter().map(MenuItem::from).collect())
    }

    pub async fn save_menu(&self, items: &[MenuItem]) -> Result<()> {
        let rows: Vec<MenuRow> = items.iter().cloned().map(MenuRow::from).collect();
        self.save_table(&rows).await
    }

    pub async fn load_reservations(&self) -> Result<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = self.load_table().await?;
        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    pub async fn save_reservations(&self, reservations: &[Reservation]) -> Result<()> {
        let rows: Vec<ReservationRow> = reservations
            .iter()
            .cloned()
            .map(ReservationRow::from)
            .collect();
        self.save_table(&rows).await
    }

    async fn load_table<R: Row>(&self) -> Result<Vec<R>> {
        let kind = R::KIND;
        let path = self.config.path_for(kind);
        let exists = fs::try_exists(path)
            .await
            .map_err(|source| io_error("inspect", path, source))?;
        if !exists {
            let header = encode_table::<R>(path, &[])?;
            if write_staged(path, header, Commit::CreateNew).await? {
                info!(store = kind.label(), path = %path.display(), "created empty store file");
            }
        }

        let raw = fs::read(path)
            .await
            .map_err(|source| io_error("read", path, source))?;
        let rows = parse_table(path, &raw)?;
        debug!(store = kind.label(), rows = rows.len(), "loaded store file");
        Ok(rows)
    }

    async fn save_table<R: Row>(&self, rows: &[R]) -> Result<()> {
        let kind = R::KIND;
        let path = self.config.path_for(kind);
        let bytes = encode_table(path, rows)?;
        write_staged(path, bytes, Commit::Replace).await?;
        debug!(store = kind.label(), rows = rows.len(), "saved store file");
        Ok(())
    }
}

/// One line of a store file, named by its column headers.
trait Row: Serialize + DeserializeOwned {
    const KIND: StoreKind;

    fn check(&self) -> std::result::Result<(), String>;
}

#[derive(Debug, Serialize, Deserialize)]
struct MenuRow {
    #[serde(rename = "Item")]
    item: String,
    #[serde(rename = "Price", with = "rust_decimal::serde::str")]
    price: Decimal,
}

impl Row for MenuRow {
    const KIND: StoreKind = StoreKind::Menu;

    fn check(&self) -> std::result::Result<(), String> {
        if self.item.is_empty() {
            return Err("item is empty".into());
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(format!("price {} is negative", self.price));
        }
        Ok(())
    }
}

impl From<MenuItem> for MenuRow {
    fn from(value: MenuItem) -> Self {
        Self {
            item: value.item,
            price: value.price,
        }
    }
}

impl From<MenuRow> for MenuItem {
    fn from(value: MenuRow) -> Self {
        MenuItem::new(value.item, value.price)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ReservationRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Guests")]
    guests: u8,
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Time", with = "stored_time")]
    time: NaiveTime,
}

impl Row for ReservationRow {
    const KIND: StoreKind = StoreKind::Reservations;

    fn check(&self) -> std::result::Result<(), String> {
        if self.name.is_empty() {
            return Err("name is empty".into());
        }
        if !(MIN_GUESTS..=MAX_GUESTS).contains(&self.guests) {
            return Err(format!(
                "guests {} outside {MIN_GUESTS}..={MAX_GUESTS}",
                self.guests
            ));
        }
        Ok(())
    }
}

/// On disk only the canonical `HH:MM` form is accepted.
mod stored_time {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{hhmm, TIME_FORMAT};

    pub(super) fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        hhmm::serialize(time, serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, TIME_FORMAT)
            .map_err(|_| de::Error::custom(format!("invalid time '{raw}', expected HH:MM")))
    }
}

impl From<Reservation> for ReservationRow {
    fn from(value: Reservation) -> Self {
        Self {
            name: value.name,
            guests: value.guests,
            date: value.date,
            time: value.time,
        }
    }
}

impl From<ReservationRow> for Reservation {
    fn from(value: ReservationRow) -> Self {
        Reservation::new(value.name, i64::from(value.guests), value.date, value.time)
    }
}

fn parse_table<R: Row>(path: &Path, raw: &[u8]) -> Result<Vec<R>> {
    let expected = R::KIND.header();
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(raw);
    let headers = reader
        .headers()
        .map_err(|source| malformed(path, source))?
        .clone();
    if !headers.iter().eq(expected.iter().copied()) {
        return Err(StorageError::Schema {
            path: path.to_path_buf(),
            expected: expected.iter().map(|column| column.to_string()).collect(),
            found: headers.iter().map(str::to_string).collect(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| malformed(path, source))?;
        let line = record.position().map_or(0, |position| position.line());
        let row: R = record
            .deserialize(Some(&headers))
            .map_err(|source| malformed(path, source))?;
        row.check().map_err(|reason| StorageError::InvalidRecord {
            path: path.to_path_buf(),
            line,
            reason,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn encode_table<R: Row>(path: &Path, rows: &[R]) -> Result<Vec<u8>> {
    let encode = |source: csv::Error| StorageError::Encode {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(R::KIND.header()).map_err(encode)?;
    for row in rows {
        writer.serialize(row).map_err(encode)?;
    }
    writer
        .into_inner()
        .map_err(|error| io_error("encode", path, error.into_error()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Commit {
    /// Overwrite whatever is at the destination.
    Replace,
    /// Only materialize the file if nothing is there yet.
    CreateNew,
}

/// Writes `bytes` to a uniquely named sibling file and moves it into place,
/// so readers never observe a partially written table. Returns whether the
/// destination was written.
async fn write_staged(path: &Path, bytes: Vec<u8>, commit: Commit) -> Result<bool> {
    let target = path.to_path_buf();
    task::spawn_blocking(move || commit_staged(&target, &bytes, commit))
        .await
        .map_err(|join| io_error("write", path, io::Error::other(join)))?
        .map_err(|source| io_error("write", path, source))
}

fn commit_staged(path: &Path, bytes: &[u8], commit: Commit) -> io::Result<bool> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;

    match commit {
        Commit::Replace => staged.persist(path).map(|_| true).map_err(|e| e.error),
        Commit::CreateNew => match staged.persist_noclobber(path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error),
        },
    }
}

async fn ensure_parent_dir_exists(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent)
        .await
        .map_err(|source| io_error("create directory", parent, source))
}

fn io_error(action: &'static str, path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

fn malformed(path: &Path, source: csv::Error) -> StorageError {
    StorageError::Malformed {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
