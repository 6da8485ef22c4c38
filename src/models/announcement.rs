// file: src/models/announcement.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnouncementType {
    /// Just informative.
    Text,
    /// No classes at all.
    FullOff,
    /// Start of a break, inclusive of that day.
    BreakStart,
    /// End of a break, exclusive of that day.
    BreakEnd,
}

impl AnnouncementType {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(AnnouncementType::Text),
            1 => Some(AnnouncementType::FullOff),
            2 => Some(AnnouncementType::BreakStart),
            3 => Some(AnnouncementType::BreakEnd),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            AnnouncementType::Text => 0,
            AnnouncementType::FullOff => 1,
            AnnouncementType::BreakStart => 2,
            AnnouncementType::BreakEnd => 3,
        }
    }
}

/// A dated notice shown at the top of a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerAnnouncement {
    pub id: i64,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub text: String,
    /// Audience classifier.
    pub grade: i64,
    #[serde(rename = "type")]
    pub kind: AnnouncementType,
}

/// A stored break: a `BreakStart` row and the first later `BreakEnd` row
/// carrying the same text. `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakBlock {
    pub start_id: i64,
    pub end_id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub name: String,
    pub grade: i64,
}

impl BreakBlock {
    pub fn day_count(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcement_type_column_values() {
        assert_eq!(AnnouncementType::from_i64(2), Some(AnnouncementType::BreakStart));
        assert_eq!(AnnouncementType::BreakEnd.as_i64(), 3);
        assert_eq!(AnnouncementType::from_i64(4), None);
    }

    #[test]
    fn test_announcement_serializes_type_field() {
        let announcement = PlannerAnnouncement {
            id: 4,
            date: "2024-01-02".to_string(),
            text: "No school".to_string(),
            grade: 0,
            kind: AnnouncementType::FullOff,
        };
        let json = serde_json::to_value(&announcement).unwrap();
        assert_eq!(json["type"], "fullOff");
        assert_eq!(json["date"], "2024-01-02");
    }

    #[test]
    fn test_break_block_day_count_excludes_end() {
        let block = BreakBlock {
            start_id: 1,
            end_id: 2,
            start: NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 25).unwrap(),
            name: "Spring Break".to_string(),
            grade: 0,
        };
        assert_eq!(block.day_count(), 7);
    }
}
