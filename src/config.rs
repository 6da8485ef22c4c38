//! Configuration module
//!
//! Settings are read from `PLANNERCAL_*` environment variables, falling back
//! to defaults for anything unset. Feed URLs are not part of the
//! configuration; they are validated when a calendar is added.

use crate::error::{AppError, AppResult};
use chrono_tz::Tz;
use log::info;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "PLANNERCAL_DB_PATH";
pub const ENV_SYNC_INTERVAL_SECS: &str = "PLANNERCAL_SYNC_INTERVAL_SECS";
pub const ENV_TIMEZONE: &str = "PLANNERCAL_TIMEZONE";
pub const ENV_MAX_VIEW_DAYS: &str = "PLANNERCAL_MAX_VIEW_DAYS";
pub const ENV_PROVIDER_TIMEOUT_SECS: &str = "PLANNERCAL_PROVIDER_TIMEOUT_SECS";
pub const ENV_ANNOUNCEMENT_GRADES: &str = "PLANNERCAL_ANNOUNCEMENT_GRADES";

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;
const DEFAULT_TIMEZONE: &str = "America/New_York";
const DEFAULT_MAX_VIEW_DAYS: i64 = 730;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// Time between background sync passes.
    pub sync_interval: Duration,
    /// Zone used when the caller does not name one.
    pub timezone: Tz,
    /// Longest window a view may be built for.
    pub max_view_days: i64,
    /// Deadline for a single provider call while building a view.
    pub provider_timeout: Duration,
    /// Audience grades whose announcements are shown.
    pub announcement_grades: Vec<i64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            timezone: chrono_tz::America::New_York,
            max_view_days: DEFAULT_MAX_VIEW_DAYS,
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            announcement_grades: vec![0],
        }
    }
}

impl AppConfig {
    /// Builds the configuration from the environment.
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let db_path = env::var(ENV_DB_PATH)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let sync_interval = Duration::from_secs(parse_var(ENV_SYNC_INTERVAL_SECS, DEFAULT_SYNC_INTERVAL_SECS)?);
        let provider_timeout = Duration::from_secs(parse_var(ENV_PROVIDER_TIMEOUT_SECS, DEFAULT_PROVIDER_TIMEOUT_SECS)?);
        let max_view_days = parse_var(ENV_MAX_VIEW_DAYS, DEFAULT_MAX_VIEW_DAYS)?;

        let timezone_name = env::var(ENV_TIMEZONE).unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let timezone = parse_timezone(&timezone_name)?;

        let announcement_grades = match env::var(ENV_ANNOUNCEMENT_GRADES) {
            Ok(raw) => parse_grades(&raw)?,
            Err(_) => defaults.announcement_grades,
        };

        Ok(Self {
            db_path,
            sync_interval,
            timezone,
            max_view_days,
            provider_timeout,
            announcement_grades,
        })
    }

    /// sqlx connection string for `db_path`.
    pub fn db_url(&self) -> String {
        format!("sqlite:{}", self.db_path.display())
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plannercal")
        .join("plannercal.db")
}

fn parse_var<T: FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{} must be a number, got '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| AppError::config(format!("Unknown time zone '{}'", name)))
}

fn parse_grades(raw: &str) -> AppResult<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| AppError::config(format!("{} contains a non-numeric grade '{}'", ENV_ANNOUNCEMENT_GRADES, part)))
        })
        .collect()
}

/// Validates application configuration
///
/// # Returns
///
/// * `Ok(())` - every setting is usable
/// * `Err(AppError::Config)` - the first setting that is not
pub fn validate_config(config: &AppConfig) -> AppResult<()> {
    info!("Validating configuration");

    if config.sync_interval.is_zero() {
        return Err(AppError::config(format!("{} must be greater than zero", ENV_SYNC_INTERVAL_SECS)));
    }
    if config.provider_timeout.is_zero() {
        return Err(AppError::config(format!("{} must be greater than zero", ENV_PROVIDER_TIMEOUT_SECS)));
    }
    if config.max_view_days <= 0 {
        return Err(AppError::config(format!("{} must be greater than zero", ENV_MAX_VIEW_DAYS)));
    }
    if config.db_path.as_os_str().is_empty() {
        return Err(AppError::config(format!("{} must not be empty", ENV_DB_PATH)));
    }

    Ok(())
}
