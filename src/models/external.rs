// file: src/models/external.rs
use super::event::{Event, EventId, EventKind, EventTag, EventTags};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A configured ICS feed whose events are fully replaced on every sync.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExternalCalendar {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl ExternalCalendar {
    /// Stable provider identifier for this calendar.
    pub fn provider_id(&self) -> String {
        format!("calendar-external-{}", self.id)
    }
}

/// One event imported from an external calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ExternalEvent {
    pub uid: String,
    pub name: String,
    pub start: i64,
    pub end: i64,
    pub calendar_id: i64,
}

impl ExternalEvent {
    /// Imported events are read-only on the user's calendar.
    pub fn into_event(self, user_id: i64) -> Event {
        Event {
            id: EventId::External(self.uid),
            name: self.name,
            start: self.start,
            end: self.end,
            recur_rule: None,
            kind: EventKind::Plain,
            tags: EventTags::new().with(EventTag::ReadOnly(true)),
            user_id,
        }
    }
}
