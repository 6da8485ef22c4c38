// file: src/database/events.rs
use crate::error::AppResult;
use crate::models::recur::{parse_stored_by_day, parse_stored_until};
use crate::models::{Event, EventId, EventKind, EventTag, EventTags, HomeworkRef, RecurFrequency, RecurRule};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// Plain events owned by `user_id` that overlap `[start, end]`, plus every
/// event with a recurrence rule regardless of its stored span: only the rule
/// is stored, so occurrences have to be worked out on every read.
pub async fn get_plain_in_window(pool: &SqlitePool, user_id: i64, start: i64, end: i64) -> AppResult<Vec<Event>> {
    let rows = sqlx::query(
        r#"
        SELECT
            e.id, e.name, e.start, e."end", e.description, e.user_id,
            r.id AS rule_id, r.event_id, r.frequency, r."interval",
            r.by_day, r.by_month_day, r.by_month, r.until
        FROM calendar_events e
        LEFT JOIN calendar_event_rules r ON e.id = r.event_id
        WHERE e.user_id = ?
            AND ((e."end" >= ? AND e.start <= ?) OR r.frequency IS NOT NULL)
        ORDER BY e.start ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    rows.iter().map(plain_event_from_row).collect()
}

fn plain_event_from_row(row: &SqliteRow) -> AppResult<Event> {
    let description: String = row.try_get("description")?;
    let mut tags = EventTags::new();
    if !description.is_empty() {
        tags.insert(EventTag::Description(description));
    }

    let recur_rule = match row.try_get::<Option<i64>, _>("rule_id")? {
        Some(rule_id) => Some(rule_from_row(rule_id, row)?),
        None => None,
    };

    Ok(Event {
        id: EventId::Stored(row.try_get("id")?),
        name: row.try_get("name")?,
        start: row.try_get("start")?,
        end: row.try_get("end")?,
        recur_rule,
        kind: EventKind::Plain,
        tags,
        user_id: row.try_get("user_id")?,
    })
}

fn rule_from_row(rule_id: i64, row: &SqliteRow) -> AppResult<RecurRule> {
    let raw_frequency: i64 = row.try_get("frequency")?;
    let frequency = RecurFrequency::from_i64(raw_frequency).ok_or_else(|| {
        sqlx::Error::Decode(format!("unknown recurrence frequency {} on rule {}", raw_frequency, rule_id).into())
    })?;

    let by_day: Option<String> = row.try_get("by_day")?;
    let until: Option<String> = row.try_get("until")?;

    Ok(RecurRule {
        id: rule_id,
        event_id: row.try_get("event_id")?,
        frequency,
        interval: row.try_get("interval")?,
        by_day: parse_stored_by_day(by_day.as_deref()),
        by_month_day: row.try_get("by_month_day")?,
        by_month: row.try_get("by_month")?,
        until: parse_stored_until(until.as_deref()),
    })
}

/// Homework-linked events whose literal span overlaps `[start, end]`.
pub async fn get_homework_in_window(pool: &SqlitePool, user_id: i64, start: i64, end: i64) -> AppResult<Vec<Event>> {
    let rows = sqlx::query(
        r#"
        SELECT
            hw_ev.id, hw.id AS homework_id, hw.name, hw.due, hw.description,
            hw.complete, hw.class_id, hw_ev.start, hw_ev."end", hw_ev.user_id
        FROM calendar_hwevents hw_ev
        INNER JOIN homework hw ON hw_ev.homework_id = hw.id
        WHERE hw_ev.user_id = ?
            AND (hw_ev."end" >= ? AND hw_ev.start <= ?)
        ORDER BY hw_ev.start ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> AppResult<Event> {
            let homework = HomeworkRef {
                id: row.try_get("homework_id")?,
                name: row.try_get("name")?,
                due: row.try_get("due")?,
                description: row.try_get("description")?,
                complete: row.try_get("complete")?,
                class_id: row.try_get("class_id")?,
            };

            Ok(Event {
                id: EventId::Stored(row.try_get("id")?),
                name: homework.name.clone(),
                start: row.try_get("start")?,
                end: row.try_get("end")?,
                recur_rule: None,
                kind: EventKind::Homework,
                tags: EventTags::new().with(EventTag::Homework(homework)),
                user_id: row.try_get("user_id")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::run_schema;

    async fn setup_test_db() -> SqlitePool {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let (_, path) = temp_file.keep().unwrap();
        let pool = SqlitePool::connect(&format!("sqlite:{}", path.to_str().unwrap()))
            .await
            .unwrap();
        run_schema(&pool).await.unwrap();
        pool
    }

    async fn insert_event(pool: &SqlitePool, name: &str, start: i64, end: i64, user_id: i64) -> i64 {
        sqlx::query(r#"INSERT INTO calendar_events (name, start, "end", description, user_id) VALUES (?, ?, ?, '', ?)"#)
            .bind(name)
            .bind(start)
            .bind(end)
            .bind(user_id)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_plain_events_filtered_by_window_and_user() {
        let pool = setup_test_db().await;
        insert_event(&pool, "inside", 150, 160, 1).await;
        insert_event(&pool, "before", 10, 20, 1).await;
        insert_event(&pool, "other user", 150, 160, 2).await;

        let events = get_plain_in_window(&pool, 1, 100, 200).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "inside");
        assert!(events[0].recur_rule.is_none());
    }

    #[tokio::test]
    async fn test_recurring_event_returned_outside_window() {
        let pool = setup_test_db().await;
        let id = insert_event(&pool, "weekly", 10, 20, 1).await;
        sqlx::query(r#"INSERT INTO calendar_event_rules (event_id, frequency, "interval", until) VALUES (?, 1, 2, '2099-12-12')"#)
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        let events = get_plain_in_window(&pool, 1, 100, 200).await.unwrap();
        assert_eq!(events.len(), 1);
        let rule = events[0].recur_rule.as_ref().unwrap();
        assert_eq!(rule.frequency, RecurFrequency::Weekly);
        assert_eq!(rule.interval, 2);
        assert_eq!(rule.until, None);
    }

    #[tokio::test]
    async fn test_unknown_frequency_is_a_data_error() {
        let pool = setup_test_db().await;
        let id = insert_event(&pool, "broken", 150, 160, 1).await;
        sqlx::query("INSERT INTO calendar_event_rules (event_id, frequency) VALUES (?, 42)")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        let result = get_plain_in_window(&pool, 1, 100, 200).await;
        assert!(matches!(result, Err(crate::error::AppError::Data(_))));
    }

    #[tokio::test]
    async fn test_homework_events_carry_homework_tag() {
        let pool = setup_test_db().await;
        let hw_id = sqlx::query("INSERT INTO homework (name, due, description, complete, class_id, user_id) VALUES ('Essay', '2024-01-03', 'draft', 0, 7, 1)")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query(r#"INSERT INTO calendar_hwevents (homework_id, start, "end", user_id) VALUES (?, 150, 160, 1)"#)
            .bind(hw_id)
            .execute(&pool)
            .await
            .unwrap();

        let events = get_homework_in_window(&pool, 1, 100, 200).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Essay");
        assert_eq!(events[0].kind, EventKind::Homework);
        let homework = events[0].tags.homework().unwrap();
        assert_eq!(homework.class_id, 7);
        assert!(!homework.complete);
    }
}
