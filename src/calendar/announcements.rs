// file: src/calendar/announcements.rs
//
// Announcements stored in the local `announcements` table, with stored break
// blocks spread over the days they cover.

use crate::calendar::provider::{DataKinds, Provider, ProviderData};
use crate::database::announcements;
use crate::error::{AppError, AppResult};
use crate::models::{AnnouncementType, BreakBlock, PlannerAnnouncement, User};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use chrono_tz::Tz;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementProvider {
    pub grades: Vec<i64>,
}

impl AnnouncementProvider {
    pub fn new(grades: Vec<i64>) -> Self {
        Self { grades }
    }

    /// Factory entry point; expects `{"grades": [..]}`.
    pub fn from_settings(settings: &serde_json::Value) -> AppResult<Arc<dyn Provider>> {
        let provider: Self = serde_json::from_value(settings.clone())
            .map_err(|e| AppError::config(format!("Invalid announcement settings: {}", e)))?;
        Ok(Arc::new(provider))
    }
}

/// "Start of X" on the first day, "X" on each following day of the break and
/// "End of X" on the day classes resume.
pub fn expand_break(block: &BreakBlock) -> Vec<PlannerAnnouncement> {
    let mut expanded = vec![PlannerAnnouncement {
        id: block.start_id,
        date: block.start.format(DATE_FORMAT).to_string(),
        text: format!("Start of {}", block.name),
        grade: block.grade,
        kind: AnnouncementType::BreakStart,
    }];

    let days = (1..block.day_count())
        .filter_map(|offset| u64::try_from(offset).ok())
        .filter_map(|offset| block.start.checked_add_days(Days::new(offset)));
    for day in days {
        expanded.push(PlannerAnnouncement {
            id: block.start_id,
            date: day.format(DATE_FORMAT).to_string(),
            text: block.name.clone(),
            grade: block.grade,
            kind: AnnouncementType::BreakStart,
        });
    }

    expanded.push(PlannerAnnouncement {
        id: block.end_id,
        date: block.end.format(DATE_FORMAT).to_string(),
        text: format!("End of {}", block.name),
        grade: block.grade,
        kind: AnnouncementType::BreakEnd,
    });

    expanded
}

#[async_trait]
impl Provider for AnnouncementProvider {
    fn id(&self) -> String {
        "announcements".to_string()
    }

    fn name(&self) -> String {
        "Announcements".to_string()
    }

    async fn get_data(
        &self,
        pool: &SqlitePool,
        _user: &User,
        tz: Tz,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        kinds: DataKinds,
    ) -> AppResult<ProviderData> {
        let mut data = ProviderData::default();
        if !kinds.contains(DataKinds::ANNOUNCEMENTS) {
            return Ok(data);
        }

        let start_date: NaiveDate = start.with_timezone(&tz).date_naive();
        let end_date: NaiveDate = end.with_timezone(&tz).date_naive();

        data.announcements = announcements::get_in_range(pool, &self.grades, start_date, end_date).await?;

        let blocks = announcements::get_break_blocks_starting_before(pool, &self.grades, end_date).await?;
        for block in blocks.iter().filter(|b| b.end >= start_date) {
            data.announcements.extend(expand_break(block));
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_expand_break_covers_each_day() {
        let block = BreakBlock {
            start_id: 10,
            end_id: 11,
            start: date(2024, 3, 18),
            end: date(2024, 3, 21),
            name: "Spring Break".to_string(),
            grade: 0,
        };

        let expanded = expand_break(&block);
        let summary: Vec<(&str, &str)> = expanded.iter().map(|a| (a.date.as_str(), a.text.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                ("2024-03-18", "Start of Spring Break"),
                ("2024-03-19", "Spring Break"),
                ("2024-03-20", "Spring Break"),
                ("2024-03-21", "End of Spring Break"),
            ]
        );
        assert_eq!(expanded[3].kind, AnnouncementType::BreakEnd);
        assert_eq!(expanded[3].id, 11);
    }

    #[tokio::test]
    async fn test_get_data_merges_plain_and_break_announcements() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let (_, path) = temp_file.keep().unwrap();
        let db = Database::open(&format!("sqlite:{}", path.to_str().unwrap()))
            .await
            .unwrap();

        for (day, text, kind) in [
            ("2024-03-15", "Assembly", 0),
            ("2024-03-18", "Spring Break", 2),
            ("2024-03-20", "Spring Break", 3),
            ("2023-12-20", "Winter Break", 2),
            ("2024-01-02", "Winter Break", 3),
        ] {
            sqlx::query("INSERT INTO announcements (date, text, grade, type) VALUES (?, ?, 0, ?)")
                .bind(day)
                .bind(text)
                .bind(kind)
                .execute(&db.pool)
                .await
                .unwrap();
        }

        let tz = chrono_tz::UTC;
        let provider = AnnouncementProvider::new(vec![0]);
        let data = provider
            .get_data(
                &db.pool,
                &User::new(1, "Sam"),
                tz,
                tz.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap(),
                tz.with_ymd_and_hms(2024, 3, 21, 0, 0, 0).unwrap(),
                DataKinds::ALL,
            )
            .await
            .unwrap();

        let texts: Vec<&str> = data.announcements.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Assembly", "Start of Spring Break", "Spring Break", "End of Spring Break"]
        );
        assert!(data.events.is_empty());
    }

    #[tokio::test]
    async fn test_get_data_reads_dates_in_requested_zone() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let (_, path) = temp_file.keep().unwrap();
        let db = Database::open(&format!("sqlite:{}", path.to_str().unwrap()))
            .await
            .unwrap();

        sqlx::query("INSERT INTO announcements (date, text, grade, type) VALUES ('2023-12-31', 'New Year''s Eve', 0, 0)")
            .execute(&db.pool)
            .await
            .unwrap();

        // midnight UTC on Jan 1st is still Dec 31st in New York
        let start = chrono_tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = chrono_tz::UTC.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let provider = AnnouncementProvider::new(vec![0]);

        let in_new_york = provider
            .get_data(&db.pool, &User::new(1, "Sam"), chrono_tz::America::New_York, start, end, DataKinds::ALL)
            .await
            .unwrap();
        assert_eq!(in_new_york.announcements.len(), 1);
        assert_eq!(in_new_york.announcements[0].date, "2023-12-31");

        let in_utc = provider
            .get_data(&db.pool, &User::new(1, "Sam"), chrono_tz::UTC, start, end, DataKinds::ALL)
            .await
            .unwrap();
        assert!(in_utc.announcements.is_empty());
    }
}
