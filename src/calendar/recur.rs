// file: src/calendar/recur.rs
//
// Expansion of a recurring event into the concrete start times that fall
// before a horizon.

use crate::models::{RecurFrequency, RecurRule};
use chrono::{DateTime, Days, Duration, Months, NaiveDate, TimeZone};
use chrono_tz::Tz;

/// Every start time of an event beginning at `start` under `rule`, in
/// ascending order. `start` itself is always the first element; further
/// occurrences are strictly before `horizon`.
///
/// Calendar arithmetic (days, months) happens on local wall-clock time in
/// `start`'s zone, so a weekly 09:00 meeting stays at 09:00 across a DST
/// change.
pub fn expand(start: DateTime<Tz>, rule: Option<&RecurRule>, horizon: DateTime<Tz>) -> Vec<DateTime<Tz>> {
    let mut occurrences = vec![start];

    let Some(rule) = rule else {
        return occurrences;
    };

    let until = rule.until.map(|date| local_midnight(date, &start.timezone()));

    let mut cursor = start;
    while cursor < horizon {
        let Some(next) = advance(cursor, rule.frequency, rule.interval) else {
            break;
        };
        if next <= cursor {
            // not making progress
            break;
        }
        cursor = next;

        if let Some(until) = until {
            if until.signed_duration_since(cursor) < -Duration::hours(24) {
                break;
            }
        }

        if cursor >= horizon {
            break;
        }
        occurrences.push(cursor);
    }

    occurrences
}

/// One step of `frequency` times `interval`. Yearly rules never move.
fn advance(cursor: DateTime<Tz>, frequency: RecurFrequency, interval: i64) -> Option<DateTime<Tz>> {
    if interval <= 0 {
        return None;
    }

    match frequency {
        RecurFrequency::Daily => add_days(cursor, interval),
        RecurFrequency::Weekly => add_days(cursor, interval.checked_mul(7)?),
        RecurFrequency::Monthly => {
            let months = u32::try_from(interval).ok()?;
            cursor.checked_add_months(Months::new(months))
        }
        RecurFrequency::Yearly => None,
    }
}

/// Adds whole days of wall-clock time. When the resulting local time does not
/// exist (or is ambiguous) falls back to exact 24 hour days.
fn add_days(cursor: DateTime<Tz>, days: i64) -> Option<DateTime<Tz>> {
    let whole = u64::try_from(days).ok()?;
    cursor
        .checked_add_days(Days::new(whole))
        .or_else(|| cursor.checked_add_signed(Duration::try_days(days)?))
}

fn local_midnight(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}
