use chrono::{NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical on-disk form for reservation dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Canonical on-disk form for reservation times.
pub const TIME_FORMAT: &str = "%H:%M";

pub const MIN_GUESTS: u8 = 1;
pub const MAX_GUESTS: u8 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub item: String,
    pub price: Decimal,
}

impl MenuItem {
    pub fn new(item: impl Into<String>, price: Decimal) -> Self {
        Self {
            item: item.into(),
            price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub name: String,
    pub guests: u8,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
}

impl Reservation {
    /// Builds a reservation in canonical form: guests clamped to the
    /// bookable range and the time truncated to whole minutes.
    pub fn new(name: impl Into<String>, guests: i64, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            name: name.into(),
            guests: clamp_guests(guests),
            date,
            time: truncate_to_minute(time),
        }
    }
}

pub fn clamp_guests(guests: i64) -> u8 {
    let clamped = guests.clamp(i64::from(MIN_GUESTS), i64::from(MAX_GUESTS));
    u8::try_from(clamped).unwrap_or(MAX_GUESTS)
}

pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Accepts `HH:MM` and `HH:MM:SS` (browsers send the latter when a seconds
/// step is configured); seconds are dropped.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
        .map(truncate_to_minute)
}

/// Serde adapter storing a `NaiveTime` as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{parse_time, TIME_FORMAT};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(TIME_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_time(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time '{raw}', expected HH:MM")))
    }
}
