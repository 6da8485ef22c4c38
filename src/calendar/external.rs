// file: src/calendar/external.rs
use crate::calendar::provider::{DataKinds, Provider, ProviderData};
use crate::database::external;
use crate::error::{AppError, AppResult};
use crate::models::User;
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Serves the events last imported for one external calendar.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalCalendarProvider {
    #[serde(rename = "id")]
    pub calendar_id: i64,
    pub name: String,
}

impl ExternalCalendarProvider {
    pub fn new(calendar_id: i64, name: impl Into<String>) -> Self {
        Self {
            calendar_id,
            name: name.into(),
        }
    }

    /// Factory entry point; expects `{"id": .., "name": ..}`.
    pub fn from_settings(settings: &serde_json::Value) -> AppResult<Arc<dyn Provider>> {
        let provider: Self = serde_json::from_value(settings.clone())
            .map_err(|e| AppError::config(format!("Invalid external calendar settings: {}", e)))?;
        Ok(Arc::new(provider))
    }
}

#[async_trait]
impl Provider for ExternalCalendarProvider {
    fn id(&self) -> String {
        format!("calendar-external-{}", self.calendar_id)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn get_data(
        &self,
        pool: &SqlitePool,
        user: &User,
        _tz: Tz,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        kinds: DataKinds,
    ) -> AppResult<ProviderData> {
        let mut data = ProviderData::default();

        if kinds.contains(DataKinds::EVENTS) {
            data.events = external::get_events_in_window(pool, self.calendar_id, start.timestamp(), end.timestamp())
                .await?
                .into_iter()
                .map(|event| event.into_event(user.id))
                .collect();
        }

        Ok(data)
    }
}
