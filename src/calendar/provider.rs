// file: src/calendar/provider.rs
use crate::calendar::announcements::AnnouncementProvider;
use crate::calendar::external::ExternalCalendarProvider;
use crate::config::AppConfig;
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Event, PlannerAnnouncement, User};
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

/// Which kinds of data a provider call should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataKinds(u8);

impl DataKinds {
    pub const ANNOUNCEMENTS: DataKinds = DataKinds(1);
    pub const EVENTS: DataKinds = DataKinds(2);
    pub const ALL: DataKinds = DataKinds(3);

    pub fn contains(&self, other: DataKinds) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DataKinds {
    type Output = DataKinds;

    fn bitor(self, rhs: DataKinds) -> DataKinds {
        DataKinds(self.0 | rhs.0)
    }
}

/// What one provider call returned. Kinds that were not requested are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderData {
    pub announcements: Vec<PlannerAnnouncement>,
    pub events: Vec<Event>,
}

/// A source of announcements and events for a user's calendar. Providers
/// only read.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, e.g. `calendar-external-3`.
    fn id(&self) -> String;

    /// Display name shown in the view.
    fn name(&self) -> String;

    async fn get_data(
        &self,
        pool: &SqlitePool,
        user: &User,
        tz: Tz,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        kinds: DataKinds,
    ) -> AppResult<ProviderData>;
}

/// Builds a provider of one kind from its stored settings.
pub type ProviderFactory = Arc<dyn Fn(&serde_json::Value) -> AppResult<Arc<dyn Provider>> + Send + Sync>;

pub const ANNOUNCEMENTS_KIND: &str = "announcements";
pub const EXTERNAL_CALENDAR_KIND: &str = "calendar-external";

/// The providers consulted when building a view, in call order, plus the
/// factories that know how to build each kind.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
    factories: HashMap<String, ProviderFactory>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .field("factories", &kinds)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that knows how to build the crate's own provider kinds.
    pub fn with_builtin_factories() -> Self {
        Self::new()
            .register_factory(ANNOUNCEMENTS_KIND, Arc::new(AnnouncementProvider::from_settings))
            .register_factory(EXTERNAL_CALENDAR_KIND, Arc::new(ExternalCalendarProvider::from_settings))
    }

    pub fn register(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn register_factory(mut self, kind: impl Into<String>, factory: ProviderFactory) -> Self {
        self.factories.insert(kind.into(), factory);
        self
    }

    /// Builds a provider of `kind` from `settings` without registering it.
    pub fn build(&self, kind: &str, settings: &serde_json::Value) -> AppResult<Arc<dyn Provider>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| AppError::config(format!("No provider factory registered for '{}'", kind)))?;
        factory(settings)
    }

    /// Builds a provider of `kind` and appends it to the call order.
    pub fn register_built(self, kind: &str, settings: &serde_json::Value) -> AppResult<Self> {
        let provider = self.build(kind, settings)?;
        Ok(self.register(provider))
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// The registry used at startup: announcements first, then one provider
    /// per enabled external calendar.
    pub async fn load(db: &Database, config: &AppConfig) -> AppResult<Self> {
        let mut registry = Self::with_builtin_factories().register_built(
            ANNOUNCEMENTS_KIND,
            &serde_json::json!({ "grades": config.announcement_grades }),
        )?;

        for calendar in db.get_enabled_external_calendars().await? {
            registry = registry.register_built(
                EXTERNAL_CALENDAR_KIND,
                &serde_json::json!({ "id": calendar.id, "name": calendar.name }),
            )?;
        }

        log::info!("Loaded {} calendar providers", registry.len());
        Ok(registry)
    }
}
