// file: src/database/external.rs
use crate::error::AppResult;
use crate::models::{ExternalCalendar, ExternalEvent};
use crate::utils::logging;
use sqlx::SqlitePool;
use std::time::Instant;

pub async fn add(pool: &SqlitePool, name: &str, url: &str) -> AppResult<i64> {
    let result = sqlx::query("INSERT INTO calendar_external (name, url, enabled) VALUES (?, ?, 1)")
        .bind(name)
        .bind(url)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_all(pool: &SqlitePool) -> AppResult<Vec<ExternalCalendar>> {
    let calendars = sqlx::query_as::<_, ExternalCalendar>(
        "SELECT id, name, url, enabled, last_synced_at FROM calendar_external ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(calendars)
}

pub async fn get_enabled(pool: &SqlitePool) -> AppResult<Vec<ExternalCalendar>> {
    let calendars = sqlx::query_as::<_, ExternalCalendar>(
        "SELECT id, name, url, enabled, last_synced_at FROM calendar_external WHERE enabled = 1 ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(calendars)
}

pub async fn set_enabled(pool: &SqlitePool, calendar_id: i64, enabled: bool) -> AppResult<()> {
    sqlx::query("UPDATE calendar_external SET enabled = ? WHERE id = ?")
        .bind(enabled)
        .bind(calendar_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn get_events(pool: &SqlitePool, calendar_id: i64) -> AppResult<Vec<ExternalEvent>> {
    let events = sqlx::query_as::<_, ExternalEvent>(
        r#"SELECT uid, name, start, "end", calendar_id FROM calendar_external_events WHERE calendar_id = ? ORDER BY start ASC, uid ASC"#,
    )
    .bind(calendar_id)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Events of one calendar that lie entirely inside `[start, end]`.
pub async fn get_events_in_window(pool: &SqlitePool, calendar_id: i64, start: i64, end: i64) -> AppResult<Vec<ExternalEvent>> {
    let events = sqlx::query_as::<_, ExternalEvent>(
        r#"
        SELECT uid, name, start, "end", calendar_id
        FROM calendar_external_events
        WHERE calendar_id = ? AND start >= ? AND "end" <= ?
        ORDER BY start ASC
        "#,
    )
    .bind(calendar_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Swaps a calendar's stored events for `events` and stamps the sync time, as
/// one transaction. On any error the transaction is dropped, which rolls it
/// back and leaves the previous event set in place.
pub async fn replace_events(pool: &SqlitePool, calendar_id: i64, events: &[ExternalEvent]) -> AppResult<()> {
    let started = Instant::now();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM calendar_external_events WHERE calendar_id = ?")
        .bind(calendar_id)
        .execute(&mut *tx)
        .await?;

    for event in events {
        sqlx::query(
            r#"INSERT INTO calendar_external_events (uid, name, start, "end", calendar_id) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&event.uid)
        .bind(&event.name)
        .bind(event.start)
        .bind(event.end)
        .bind(calendar_id)
        .execute(&mut *tx)
        .await?;
    }

    let updated = sqlx::query("UPDATE calendar_external SET last_synced_at = ? WHERE id = ?")
        .bind(chrono::Utc::now())
        .bind(calendar_id)
        .execute(&mut *tx)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound.into());
    }

    tx.commit().await?;

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    logging::log_database_operation("replace events", "calendar_external_events", elapsed_ms);
    Ok(())
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

    fn external_event(uid: &str, start: i64) -> ExternalEvent {
        ExternalEvent {
            uid: uid.to_string(),
            name: format!("Event {}", uid),
            start,
            end: start + 3600,
            calendar_id: 0,
        }
    }

    #[tokio::test]
    async fn test_add_and_list_calendars() {
        let pool = setup_test_db().await;
        let id = add(&pool, "Robotics", "https://example.com/robotics.ics").await.unwrap();
        assert!(id > 0);

        let calendars = get_all(&pool).await.unwrap();
        assert_eq!(calendars.len(), 1);
        assert_eq!(calendars[0].name, "Robotics");
        assert!(calendars[0].enabled);
        assert!(calendars[0].last_synced_at.is_none());
    }

    #[tokio::test]
    async fn test_disabled_calendars_not_enabled() {
        let pool = setup_test_db().await;
        let first = add(&pool, "A", "https://example.com/a.ics").await.unwrap();
        add(&pool, "B", "https://example.com/b.ics").await.unwrap();
        set_enabled(&pool, first, false).await.unwrap();

        let enabled = get_enabled(&pool).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "B");
    }

    #[tokio::test]
    async fn test_replace_events_swaps_whole_set() {
        let pool = setup_test_db().await;
        let id = add(&pool, "Robotics", "https://example.com/robotics.ics").await.unwrap();

        replace_events(&pool, id, &[external_event("a", 100), external_event("b", 200)])
            .await
            .unwrap();
        replace_events(&pool, id, &[external_event("c", 300)]).await.unwrap();

        let events = get_events(&pool, id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "c");
        assert_eq!(events[0].calendar_id, id);

        let calendars = get_all(&pool).await.unwrap();
        assert!(calendars[0].last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_replace_events_for_missing_calendar_rolls_back() {
        let pool = setup_test_db().await;

        let result = replace_events(&pool, 99, &[external_event("a", 100)]).await;
        assert!(result.is_err());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM calendar_external_events")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_failed_insert_keeps_previous_events() {
        let pool = setup_test_db().await;
        let id = add(&pool, "Robotics", "https://example.com/robotics.ics").await.unwrap();
        replace_events(&pool, id, &[external_event("a", 100), external_event("b", 200)])
            .await
            .unwrap();
        let synced_at = get_all(&pool).await.unwrap()[0].last_synced_at;

        sqlx::query(
            r#"
            CREATE TRIGGER reject_broken_uid BEFORE INSERT ON calendar_external_events
            WHEN NEW.uid = 'broken'
            BEGIN
                SELECT RAISE(ABORT, 'rejected');
            END
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let result = replace_events(&pool, id, &[external_event("c", 300), external_event("broken", 400)]).await;
        assert!(result.is_err());

        let uids: Vec<String> = get_events(&pool, id).await.unwrap().into_iter().map(|e| e.uid).collect();
        assert_eq!(uids, vec!["a", "b"]);
        assert_eq!(get_all(&pool).await.unwrap()[0].last_synced_at, synced_at);
    }

    #[tokio::test]
    async fn test_events_in_window_require_full_containment() {
        let pool = setup_test_db().await;
        let id = add(&pool, "Robotics", "https://example.com/robotics.ics").await.unwrap();
        replace_events(
            &pool,
            id,
            &[external_event("inside", 1000), external_event("straddles", 9000)],
        )
        .await
        .unwrap();

        let events = get_events_in_window(&pool, id, 0, 10_000).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "inside");
    }
}
