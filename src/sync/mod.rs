// file: src/sync/mod.rs
//
// Background import of external calendar feeds. Each calendar is fetched,
// parsed and swapped into the store in one transaction; a failure leaves the
// previously imported events untouched.

use crate::calendar::FeedFetcher;
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::{ExternalCalendar, SyncResult, SyncSummary};
use crate::utils::logging;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

/// `internal_tasks` id stamped after every fully successful pass.
pub const TASK_ID: &str = "calendar_sync";

/// One lock per calendar id, so a calendar is never synced twice at once.
#[derive(Debug, Clone, Default)]
pub struct SyncLocks {
    locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl SyncLocks {
    async fn lock_for(&self, calendar_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(calendar_id).or_default().clone()
    }
}

pub struct CalendarSyncer {
    db: Arc<Database>,
    fetcher: Arc<dyn FeedFetcher>,
    locks: SyncLocks,
}

impl CalendarSyncer {
    pub fn new(db: Arc<Database>, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            db,
            fetcher,
            locks: SyncLocks::default(),
        }
    }

    /// Re-imports one calendar. Returns `AlreadyRunning` without doing
    /// anything when another sync of the same calendar is in flight.
    pub async fn sync_calendar(&self, calendar: &ExternalCalendar, cancel: &CancellationToken) -> AppResult<SyncResult> {
        let lock = self.locks.lock_for(calendar.id).await;
        let Ok(_guard) = lock.try_lock() else {
            warn!("Sync of calendar '{}' already in progress, skipping", calendar.name);
            return Ok(SyncResult::already_running(calendar.id));
        };

        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let started = Instant::now();
        debug!("Fetching feed for calendar '{}'", calendar.name);

        let mut events = self.fetcher.fetch_events(&calendar.url, cancel).await?;
        for event in &mut events {
            event.calendar_id = calendar.id;
        }

        self.db.replace_external_events(calendar.id, &events).await?;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        logging::log_calendar_sync(&calendar.name, events.len(), elapsed_ms);
        Ok(SyncResult::replaced(calendar.id, events.len()))
    }

    /// Syncs every enabled calendar in order. The pass stops at the first
    /// calendar that fails; calendars already synced keep their new events.
    pub async fn sync_calendars(&self, cancel: &CancellationToken) -> AppResult<SyncSummary> {
        info!("Starting calendar sync");

        let calendars = self.db.get_enabled_external_calendars().await?;
        let mut summary = SyncSummary::default();

        for calendar in &calendars {
            match self.sync_calendar(calendar, cancel).await {
                Ok(result) => summary.results.push(result),
                Err(e) => {
                    error!("Failed to sync calendar '{}': {}", calendar.name, e.to_safe_string());
                    return Err(e);
                }
            }
        }

        self.db.update_last_completion(TASK_ID).await?;

        info!(
            "Calendar sync completed: {} calendars, {} events",
            summary.calendars_synced(),
            summary.events_stored()
        );
        Ok(summary)
    }
}

/// Runs a sync pass immediately and then every `interval` until `shutdown`
/// is cancelled.
pub fn spawn_sync_loop(syncer: Arc<CalendarSyncer>, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting calendar sync loop every {}s", interval.as_secs());

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match syncer.sync_calendars(&shutdown).await {
                Ok(_) => {}
                Err(AppError::Cancelled) => break,
                Err(e) => logging::log_error_with_context(&e, "calendar sync loop"),
            }

            tokio::select! {
                _ = sleep(interval) => {}
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received during sleep, stopping sync loop");
                    break;
                }
            }
        }

        info!("Calendar sync loop stopped gracefully");
    })
}

/// Starts one sync pass in the background and returns right away.
pub fn trigger_sync(syncer: Arc<CalendarSyncer>, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = syncer.sync_calendars(&shutdown).await {
            logging::log_error_with_context(&e, "triggered calendar sync");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExternalEvent, SyncOutcome};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Blocks inside the fetch until released, so a second sync can observe
    /// the first one in flight.
    struct GatedFetcher {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl FeedFetcher for GatedFetcher {
        async fn fetch_events(&self, _url: &str, _cancel: &CancellationToken) -> AppResult<Vec<ExternalEvent>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Vec::new())
        }
    }

    async fn setup_test_db() -> Arc<Database> {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let (_, path) = temp_file.keep().unwrap();
        Arc::new(
            Database::open(&format!("sqlite:{}", path.to_str().unwrap()))
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_concurrent_sync_of_same_calendar_is_skipped() {
        let db = setup_test_db().await;
        let id = db.add_external_calendar("Robotics", "https://example.com/r.ics").await.unwrap();
        let calendar = db.get_external_calendars().await.unwrap().remove(0);
        assert_eq!(calendar.id, id);

        let fetcher = Arc::new(GatedFetcher {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let syncer = Arc::new(CalendarSyncer::new(db.clone(), fetcher.clone()));
        let cancel = CancellationToken::new();

        let first = {
            let syncer = syncer.clone();
            let calendar = calendar.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { syncer.sync_calendar(&calendar, &cancel).await })
        };
        fetcher.entered.notified().await;

        let second = syncer.sync_calendar(&calendar, &cancel).await.unwrap();
        assert_eq!(second.outcome, SyncOutcome::AlreadyRunning);

        fetcher.release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first.outcome, SyncOutcome::Replaced);
    }

    #[tokio::test]
    async fn test_cancelled_sync_does_not_fetch() {
        let db = setup_test_db().await;
        db.add_external_calendar("Robotics", "https://example.com/r.ics").await.unwrap();
        let calendar = db.get_external_calendars().await.unwrap().remove(0);

        let fetcher = Arc::new(GatedFetcher {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let syncer = CalendarSyncer::new(db, fetcher);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = syncer.sync_calendar(&calendar, &cancel).await;
        assert!(matches!(result, Err(AppError::Cancelled)));
    }
}
