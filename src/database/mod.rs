// file: src/database/mod.rs

use crate::error::AppResult;
use crate::models::{BreakBlock, Event, ExternalCalendar, ExternalEvent, PlannerAnnouncement};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::info;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePool, Sqlite};

pub mod announcements;
pub mod events;
pub mod external;
pub mod tasks;

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the SQLite database at `db_url` and applies
    /// the schema.
    pub async fn open(db_url: &str) -> Result<Self> {
        let db_exists = Sqlite::database_exists(db_url)
            .await
            .context("Failed to check if database exists")?;
        if !db_exists {
            info!("Creating database");
            Sqlite::create_database(db_url)
                .await
                .context("Failed to create database")?;
        }

        let pool = SqlitePool::connect(db_url)
            .await
            .context("Failed to connect to database")?;

        run_schema(&pool).await.context("Failed to run database schema")?;

        info!("Database initialized successfully");

        Ok(Database { pool })
    }

    // --- Event Delegates ---

    pub async fn get_plain_events(&self, user_id: i64, start: i64, end: i64) -> AppResult<Vec<Event>> {
        events::get_plain_in_window(&self.pool, user_id, start, end).await
    }

    pub async fn get_homework_events(&self, user_id: i64, start: i64, end: i64) -> AppResult<Vec<Event>> {
        events::get_homework_in_window(&self.pool, user_id, start, end).await
    }

    // --- Announcement Delegates ---

    pub async fn get_announcements(
        &self,
        grades: &[i64],
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<PlannerAnnouncement>> {
        announcements::get_in_range(&self.pool, grades, start, end).await
    }

    pub async fn get_break_blocks(&self, grades: &[i64], before: NaiveDate) -> AppResult<Vec<BreakBlock>> {
        announcements::get_break_blocks_starting_before(&self.pool, grades, before).await
    }

    // --- External Calendar Delegates ---

    pub async fn add_external_calendar(&self, name: &str, url: &str) -> AppResult<i64> {
        external::add(&self.pool, name, url).await
    }

    pub async fn get_external_calendars(&self) -> AppResult<Vec<ExternalCalendar>> {
        external::get_all(&self.pool).await
    }

    pub async fn get_enabled_external_calendars(&self) -> AppResult<Vec<ExternalCalendar>> {
        external::get_enabled(&self.pool).await
    }

    pub async fn set_external_calendar_enabled(&self, calendar_id: i64, enabled: bool) -> AppResult<()> {
        external::set_enabled(&self.pool, calendar_id, enabled).await
    }

    pub async fn get_external_events(&self, calendar_id: i64) -> AppResult<Vec<ExternalEvent>> {
        external::get_events(&self.pool, calendar_id).await
    }

    pub async fn replace_external_events(&self, calendar_id: i64, events: &[ExternalEvent]) -> AppResult<()> {
        external::replace_events(&self.pool, calendar_id, events).await
    }

    // --- Task Delegates ---

    pub async fn get_last_completion(&self, task_id: &str) -> AppResult<Option<NaiveDate>> {
        tasks::get_last_completion(&self.pool, task_id).await
    }

    pub async fn update_last_completion(&self, task_id: &str) -> AppResult<()> {
        tasks::update_last_completion(&self.pool, task_id).await
    }
}

pub(crate) async fn run_schema(pool: &SqlitePool) -> Result<()> {
    let schema = include_str!("schema.sql");

    let mut current_statement = String::new();

    for line in schema.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") || trimmed.is_empty() {
            continue;
        }

        current_statement.push_str(line);
        current_statement.push('\n');

        if trimmed.ends_with(';') {
            sqlx::query(&current_statement).execute(pool).await?;
            current_statement.clear();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    async fn create_test_database() -> Database {
        let temp_file = NamedTempFile::new().unwrap();
        let (_, path) = temp_file.keep().unwrap();
        let db_url = format!("sqlite:{}", path.to_str().unwrap());

        Database::open(&db_url).await.unwrap()
    }

    #[tokio::test]
    async fn test_database_open() {
        let db = create_test_database().await;
        assert!(!db.pool.is_closed());
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let db = create_test_database().await;
        run_schema(&db.pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();
        let names: Vec<String> = tables.into_iter().map(|t| t.0).collect();

        assert_eq!(
            names,
            vec![
                "announcements",
                "calendar_event_rules",
                "calendar_events",
                "calendar_external",
                "calendar_external_events",
                "calendar_hwevents",
                "homework",
                "internal_tasks",
            ]
        );
    }

    #[tokio::test]
    async fn test_open_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.db");
        let db_url = format!("sqlite:{}", path.to_str().unwrap());

        let db = Database::open(&db_url).await.unwrap();
        assert!(path.exists());
        assert!(db.get_external_calendars().await.unwrap().is_empty());
    }
}
