// file: src/database/announcements.rs
use crate::error::AppResult;
use crate::models::{AnnouncementType, BreakBlock, PlannerAnnouncement};
use chrono::NaiveDate;
use log::warn;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn grade_placeholders(grades: &[i64]) -> String {
    vec!["?"; grades.len()].join(", ")
}

fn announcement_from_row(row: &SqliteRow) -> AppResult<PlannerAnnouncement> {
    let raw_type: i64 = row.try_get("type")?;
    let kind = AnnouncementType::from_i64(raw_type)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown announcement type {}", raw_type).into()))?;

    Ok(PlannerAnnouncement {
        id: row.try_get("id")?,
        date: row.try_get("date")?,
        text: row.try_get("text")?,
        grade: row.try_get("grade")?,
        kind,
    })
}

/// Informative and full-day-off announcements dated within `[start, end]` for
/// any of `grades`. Break rows are read separately through
/// [`get_break_blocks_starting_before`].
pub async fn get_in_range(
    pool: &SqlitePool,
    grades: &[i64],
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<PlannerAnnouncement>> {
    if grades.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT id, date, text, grade, type FROM announcements
         WHERE date >= ? AND date <= ? AND grade IN ({}) AND type < 2
         ORDER BY date ASC, id ASC",
        grade_placeholders(grades)
    );

    let mut query = sqlx::query(&sql)
        .bind(start.format(DATE_FORMAT).to_string())
        .bind(end.format(DATE_FORMAT).to_string());
    for grade in grades {
        query = query.bind(*grade);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(announcement_from_row).collect()
}

/// Breaks for `grades` whose start date is before `before`, each paired with
/// the earliest later end row of the same text. Starts with no matching end
/// are skipped.
pub async fn get_break_blocks_starting_before(
    pool: &SqlitePool,
    grades: &[i64],
    before: NaiveDate,
) -> AppResult<Vec<BreakBlock>> {
    if grades.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = grade_placeholders(grades);
    let starts_sql = format!(
        "SELECT id, date, text, grade FROM announcements
         WHERE grade IN ({}) AND type = 2 AND date < ?
         ORDER BY date ASC, id ASC",
        placeholders
    );
    let end_sql = format!(
        "SELECT id, date FROM announcements
         WHERE grade IN ({}) AND type = 3 AND text = ? AND date > ?
         ORDER BY date ASC, id ASC
         LIMIT 1",
        placeholders
    );

    let mut starts_query = sqlx::query(&starts_sql);
    for grade in grades {
        starts_query = starts_query.bind(*grade);
    }
    let start_rows = starts_query
        .bind(before.format(DATE_FORMAT).to_string())
        .fetch_all(pool)
        .await?;

    let mut blocks = Vec::with_capacity(start_rows.len());
    for row in &start_rows {
        let start_id: i64 = row.try_get("id")?;
        let start_text: String = row.try_get("date")?;
        let name: String = row.try_get("text")?;
        let grade: i64 = row.try_get("grade")?;

        let mut end_query = sqlx::query(&end_sql);
        for g in grades {
            end_query = end_query.bind(*g);
        }
        let end_row = end_query
            .bind(&name)
            .bind(&start_text)
            .fetch_optional(pool)
            .await?;

        let Some(end_row) = end_row else {
            warn!("Break '{}' starting {} has no end, skipping", name, start_text);
            continue;
        };
        let end_id: i64 = end_row.try_get("id")?;
        let end_text: String = end_row.try_get("date")?;

        let start = parse_date(&start_text)?;
        let end = parse_date(&end_text)?;

        blocks.push(BreakBlock {
            start_id,
            end_id,
            start,
            end,
            name,
            grade,
        });
    }

    Ok(blocks)
}

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(date)
}
