// file: src/models/event.rs
use super::recur::RecurRule;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::mem::discriminant;

/// Where an event's identity comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventId {
    /// Row id in one of the local event tables.
    Stored(i64),
    /// Stable UID from an imported feed.
    External(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Plain,
    Homework,
    Schedule,
}

/// A link shown next to an event, e.g. a class website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAction {
    pub icon: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkRef {
    pub id: i64,
    pub name: String,
    pub due: String,
    pub description: String,
    pub complete: bool,
    pub class_id: i64,
}

/// One optional attribute attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "value", rename_all = "camelCase")]
pub enum EventTag {
    ReadOnly(bool),
    Cancelable(bool),
    Cancelled(bool),
    Description(String),
    Location(String),
    BuildingName(String),
    RoomNumber(String),
    Section(String),
    ShortName(String),
    Actions(Vec<EventAction>),
    Homework(HomeworkRef),
}

/// The tag bag. Holds at most one tag of each kind; inserting a tag of a kind
/// that is already present replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTags(Vec<EventTag>);

impl EventTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: EventTag) -> Self {
        self.insert(tag);
        self
    }

    pub fn insert(&mut self, tag: EventTag) {
        let kind = discriminant(&tag);
        match self.0.iter_mut().find(|t| discriminant(*t) == kind) {
            Some(existing) => *existing = tag,
            None => self.0.push(tag),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventTag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn read_only(&self) -> bool {
        self.0.iter().any(|t| matches!(t, EventTag::ReadOnly(true)))
    }

    pub fn cancelable(&self) -> bool {
        self.0.iter().any(|t| matches!(t, EventTag::Cancelable(true)))
    }

    pub fn cancelled(&self) -> bool {
        self.0.iter().any(|t| matches!(t, EventTag::Cancelled(true)))
    }

    pub fn description(&self) -> Option<&str> {
        self.0.iter().find_map(|t| match t {
            EventTag::Description(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn location(&self) -> Option<&str> {
        self.0.iter().find_map(|t| match t {
            EventTag::Location(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn building_name(&self) -> Option<&str> {
        self.0.iter().find_map(|t| match t {
            EventTag::BuildingName(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn room_number(&self) -> Option<&str> {
        self.0.iter().find_map(|t| match t {
            EventTag::RoomNumber(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn section(&self) -> Option<&str> {
        self.0.iter().find_map(|t| match t {
            EventTag::Section(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn short_name(&self) -> Option<&str> {
        self.0.iter().find_map(|t| match t {
            EventTag::ShortName(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn actions(&self) -> &[EventAction] {
        self.0
            .iter()
            .find_map(|t| match t {
                EventTag::Actions(actions) => Some(actions.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn homework(&self) -> Option<&HomeworkRef> {
        self.0.iter().find_map(|t| match t {
            EventTag::Homework(hw) => Some(hw),
            _ => None,
        })
    }
}

/// An event on a user's calendar: manually added, linked to homework, from a
/// school schedule or imported from an external feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub name: String,
    /// Seconds since the Unix epoch.
    pub start: i64,
    /// Seconds since the Unix epoch. Only a span hint.
    pub end: i64,
    pub recur_rule: Option<RecurRule>,
    pub kind: EventKind,
    pub tags: EventTags,
    pub user_id: i64,
}

impl Event {
    pub fn start_time(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.start, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.end, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn is_recurring(&self) -> bool {
        self.recur_rule.is_some()
    }

    /// True when `[start, end]` touches `[window_start, window_end]`.
    pub fn overlaps(&self, window_start: i64, window_end: i64) -> bool {
        self.end >= window_start && self.start <= window_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_event(start: i64, end: i64) -> Event {
        Event {
            id: EventId::Stored(1),
            name: "Study group".to_string(),
            start,
            end,
            recur_rule: None,
            kind: EventKind::Plain,
            tags: EventTags::new(),
            user_id: 1,
        }
    }

    #[test]
    fn test_tag_insert_replaces_same_kind() {
        let mut tags = EventTags::new()
            .with(EventTag::Location("Library".to_string()))
            .with(EventTag::ReadOnly(true));
        tags.insert(EventTag::Location("Gym".to_string()));

        assert_eq!(tags.len(), 2);
        assert_eq!(tags.location(), Some("Gym"));
        assert!(tags.read_only());
    }

    #[test]
    fn test_missing_tags_read_as_defaults() {
        let tags = EventTags::new();
        assert!(!tags.read_only());
        assert!(!tags.cancelable());
        assert!(tags.actions().is_empty());
        assert_eq!(tags.room_number(), None);
        assert!(tags.homework().is_none());
    }

    #[test]
    fn test_tags_serialize_with_tag_names() {
        let tags = EventTags::new()
            .with(EventTag::ReadOnly(true))
            .with(EventTag::RoomNumber("301".to_string()));
        let json = serde_json::to_value(&tags).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"tag": "readOnly", "value": true},
                {"tag": "roomNumber", "value": "301"}
            ])
        );
    }

    #[test]
    fn test_event_overlaps_window() {
        let event = plain_event(100, 200);
        assert!(event.overlaps(150, 300));
        assert!(event.overlaps(0, 100));
        assert!(event.overlaps(200, 400));
        assert!(!event.overlaps(201, 400));
        assert!(!event.overlaps(0, 99));
    }

    #[test]
    fn test_event_start_time_conversion() {
        let event = plain_event(1_704_067_200, 1_704_070_800);
        assert_eq!(event.start_time().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!((event.end_time() - event.start_time()).num_hours(), 1);
    }
}
