// file: src/models/recur.rs
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Stored in place of a NULL `until`; never a real boundary.
pub const UNTIL_SENTINEL: &str = "2099-12-12";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurFrequency {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(RecurFrequency::Daily),
            1 => Some(RecurFrequency::Weekly),
            2 => Some(RecurFrequency::Monthly),
            3 => Some(RecurFrequency::Yearly),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            RecurFrequency::Daily => 0,
            RecurFrequency::Weekly => 1,
            RecurFrequency::Monthly => 2,
            RecurFrequency::Yearly => 3,
        }
    }
}

/// How an event repeats. Inspired by the iCal RRULE system; only
/// `frequency`, `interval` and `until` drive expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurRule {
    pub id: i64,
    pub event_id: i64,
    pub frequency: RecurFrequency,
    pub interval: i64,
    pub by_day: Vec<Weekday>,
    pub by_month_day: i64,
    pub by_month: i64,
    pub until: Option<NaiveDate>,
}

impl RecurRule {
    pub fn new(frequency: RecurFrequency, interval: i64) -> Self {
        Self {
            id: 0,
            event_id: 0,
            frequency,
            interval,
            by_day: Vec::new(),
            by_month_day: 0,
            by_month: 0,
            until: None,
        }
    }

    pub fn with_until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }
}

/// Reads a stored `until` column. The sentinel, an empty string and anything
/// that is not a `YYYY-MM-DD` date all mean "no until".
pub fn parse_stored_until(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() || raw == UNTIL_SENTINEL {
        return None;
    }

    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            log::warn!("Ignoring malformed recurrence until '{}': {}", raw, e);
            None
        }
    }
}

/// Reads the comma separated `by_day` column (0 = Sunday .. 6 = Saturday).
pub fn parse_stored_by_day(raw: Option<&str>) -> Vec<Weekday> {
    raw.unwrap_or("")
        .split(',')
        .filter_map(|part| part.trim().parse::<u8>().ok())
        .filter_map(|n| match n {
            0 => Some(Weekday::Sun),
            1 => Some(Weekday::Mon),
            2 => Some(Weekday::Tue),
            3 => Some(Weekday::Wed),
            4 => Some(Weekday::Thu),
            5 => Some(Weekday::Fri),
            6 => Some(Weekday::Sat),
            _ => None,
        })
        .collect()
}
