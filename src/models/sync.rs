// file: src/models/sync.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncOutcome {
    /// The stored event set was replaced.
    Replaced,
    /// Another sync of the same calendar was in flight; nothing was done.
    AlreadyRunning,
}

/// Result of syncing one external calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub calendar_id: i64,
    pub outcome: SyncOutcome,
    pub events_stored: usize,
    pub sync_time: DateTime<Utc>,
}

impl SyncResult {
    pub fn replaced(calendar_id: i64, events_stored: usize) -> Self {
        Self {
            calendar_id,
            outcome: SyncOutcome::Replaced,
            events_stored,
            sync_time: Utc::now(),
        }
    }

    pub fn already_running(calendar_id: i64) -> Self {
        Self {
            calendar_id,
            outcome: SyncOutcome::AlreadyRunning,
            events_stored: 0,
            sync_time: Utc::now(),
        }
    }
}

/// Totals for one pass over all enabled calendars.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    pub results: Vec<SyncResult>,
}

impl SyncSummary {
    pub fn calendars_synced(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == SyncOutcome::Replaced)
            .count()
    }

    pub fn events_stored(&self) -> usize {
        self.results.iter().map(|r| r.events_stored).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_result_replaced() {
        let result = SyncResult::replaced(1, 5);
        assert_eq!(result.outcome, SyncOutcome::Replaced);
        assert_eq!(result.calendar_id, 1);
        assert_eq!(result.events_stored, 5);
    }

    #[test]
    fn test_summary_skips_calendars_already_running() {
        let summary = SyncSummary {
            results: vec![
                SyncResult::replaced(1, 5),
                SyncResult::already_running(2),
                SyncResult::replaced(3, 2),
            ],
        };
        assert_eq!(summary.calendars_synced(), 2);
        assert_eq!(summary.events_stored(), 7);
    }
}
