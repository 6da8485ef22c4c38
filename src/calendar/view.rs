// file: src/calendar/view.rs
use crate::calendar::provider::{DataKinds, ProviderRegistry};
use crate::calendar::recur;
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::{User, View, ViewDay};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SECONDS_PER_DAY: i64 = 86_400;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A validated `[start, end)` window in one time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewWindow {
    pub tz: Tz,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl ViewWindow {
    /// Parses `YYYY-MM-DD` dates as local midnight in `tz`. The end must come
    /// after the start and the span may not exceed `max_days`.
    pub fn parse(start_date: &str, end_date: &str, tz: Tz, max_days: i64) -> AppResult<Self> {
        let start = local_midnight(parse_date(start_date)?, tz)?;
        let end = local_midnight(parse_date(end_date)?, tz)?;

        if end <= start {
            return Err(AppError::config(format!(
                "View end {} must be after start {}",
                end_date, start_date
            )));
        }

        let days = (end - start).num_seconds().div_euclid(SECONDS_PER_DAY);
        if days > max_days {
            return Err(AppError::config(format!(
                "View spans {} days, more than the allowed {}",
                days, max_days
            )));
        }

        Ok(Self { tz, start, end })
    }
}

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::config(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

fn local_midnight(date: NaiveDate, tz: Tz) -> AppResult<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .ok_or_else(|| AppError::config(format!("Midnight of {} does not exist in {}", date, tz.name())))
}

/// Number of day buckets for a window: whole days, rounded up.
pub fn bucket_count(start: DateTime<Tz>, end: DateTime<Tz>) -> usize {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    usize::try_from((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY).unwrap_or(0)
}

/// Bucket index of an instant, rounding down.
pub fn floor_offset(instant: i64, window_start: i64) -> i64 {
    (instant - window_start).div_euclid(SECONDS_PER_DAY)
}

/// Bucket index of an instant, rounding up.
pub fn ceil_offset(instant: i64, window_start: i64) -> i64 {
    -(window_start - instant).div_euclid(SECONDS_PER_DAY)
}

fn slot(offset: i64, count: usize) -> Option<usize> {
    usize::try_from(offset).ok().filter(|index| *index < count)
}

/// Assembles a user's [`View`] from stored events, homework and every
/// registered provider.
#[derive(Clone)]
pub struct ViewBuilder {
    db: Arc<Database>,
    registry: Arc<ProviderRegistry>,
    provider_timeout: Duration,
}

impl ViewBuilder {
    pub fn new(db: Arc<Database>, registry: Arc<ProviderRegistry>, provider_timeout: Duration) -> Self {
        Self {
            db,
            registry,
            provider_timeout,
        }
    }

    pub async fn build_window(&self, user: &User, window: &ViewWindow) -> AppResult<View> {
        self.build_view(user, window.tz, window.start, window.end).await
    }

    /// Builds the view for `[start, end)`. Any failing query or provider
    /// aborts the whole build.
    pub async fn build_view(&self, user: &User, tz: Tz, start: DateTime<Tz>, end: DateTime<Tz>) -> AppResult<View> {
        let started = Instant::now();
        let count = bucket_count(start, end);
        let first_day = start.with_timezone(&tz).date_naive();
        let window_start = start.timestamp();
        let window_end = end.timestamp();

        let mut view = View::default();
        for index in 0..count {
            let day = u64::try_from(index)
                .ok()
                .and_then(|i| first_day.checked_add_days(Days::new(i)))
                .ok_or_else(|| AppError::config("View window runs past the supported date range"))?;
            view.days.push(ViewDay::new(day.format(DATE_FORMAT).to_string()));
        }

        // plain events, with recurring ones expanded up to the window end
        let plain_events = self.db.get_plain_events(user.id, window_start, window_end).await?;
        debug!("Placing {} plain events", plain_events.len());
        for event in &plain_events {
            let event_start = event.start_time().with_timezone(&tz);
            for occurrence in recur::expand(event_start, event.recur_rule.as_ref(), end) {
                if let Some(index) = slot(floor_offset(occurrence.timestamp(), window_start), count) {
                    view.days[index].events.push(event.clone());
                }
            }
        }

        let homework_events = self.db.get_homework_events(user.id, window_start, window_end).await?;
        debug!("Placing {} homework events", homework_events.len());
        for event in homework_events {
            if let Some(index) = slot(floor_offset(event.start, window_start), count) {
                view.days[index].events.push(event);
            }
        }

        for provider in self.registry.providers() {
            let name = provider.name();
            view.providers.push(name.clone());

            let data = tokio::time::timeout(
                self.provider_timeout,
                provider.get_data(&self.db.pool, user, tz, start, end, DataKinds::ALL),
            )
            .await
            .map_err(|_| {
                AppError::timeout(format!(
                    "Provider '{}' did not respond within {}s",
                    name,
                    self.provider_timeout.as_secs()
                ))
            })??;

            debug!(
                "Provider '{}' returned {} announcements and {} events",
                name,
                data.announcements.len(),
                data.events.len()
            );

            for announcement in data.announcements {
                let date = NaiveDate::parse_from_str(&announcement.date, DATE_FORMAT).map_err(|e| {
                    anyhow::anyhow!(
                        "Provider '{}' returned malformed announcement date '{}': {}",
                        name,
                        announcement.date,
                        e
                    )
                })?;
                // announcement dates are midnight UTC, not midnight in `tz`
                let instant = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)).timestamp();
                if let Some(index) = slot(ceil_offset(instant, window_start), count) {
                    view.days[index].announcements.push(announcement);
                }
            }

            for event in data.events {
                if let Some(index) = slot(floor_offset(event.start, window_start), count) {
                    view.days[index].events.push(event);
                }
            }
        }

        info!(
            "Built {}-day view for user {} with {} events and {} announcements in {}ms",
            count,
            user.id,
            view.event_count(),
            view.announcement_count(),
            started.elapsed().as_millis()
        );

        Ok(view)
    }
}
