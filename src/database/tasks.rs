// file: src/database/tasks.rs
//
// Last-completion markers for background tasks, so a task can be re-triggered
// and tell when it last finished.
use crate::error::AppResult;
use chrono::NaiveDate;
use sqlx::SqlitePool;

pub async fn get_last_completion(pool: &SqlitePool, task_id: &str) -> AppResult<Option<NaiveDate>> {
    let raw: Option<String> = sqlx::query_scalar("SELECT last_completion FROM internal_tasks WHERE task_id = ?")
        .bind(task_id)
        .fetch_optional(pool)
        .await?;

    match raw {
        Some(value) => {
            let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            Ok(Some(date))
        }
        None => Ok(None),
    }
}

pub async fn update_last_completion(pool: &SqlitePool, task_id: &str) -> AppResult<()> {
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();

    sqlx::query(
        "INSERT INTO internal_tasks (task_id, last_completion) VALUES (?, ?)
         ON CONFLICT(task_id) DO UPDATE SET last_completion = excluded.last_completion",
    )
    .bind(task_id)
    .bind(today)
    .execute(pool)
    .await?;

    Ok(())
}
