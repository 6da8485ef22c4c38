use crate::calendar::ics::IcsParser;
use crate::error::{AppError, AppResult};
use crate::http_config::HttpConfig;
use crate::models::ExternalEvent;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Validates an ICS URL for security and format correctness
pub fn validate_ics_url_format(ics_url: &str) -> AppResult<()> {
    // Check for empty or whitespace-only URL
    if ics_url.trim().is_empty() {
        return Err(AppError::config(
            "ICS URL cannot be empty. Please provide a valid calendar ICS URL.",
        ));
    }

    let parsed_url = Url::parse(ics_url).map_err(|e| {
        AppError::config(format!(
            "Invalid ICS URL format: {}. Please ensure the URL is properly formatted (e.g., https://calendar.example.com/path/calendar.ics)",
            e
        ))
    })?;

    // Enforce HTTPS for security
    if parsed_url.scheme() != "https" {
        return Err(AppError::config(format!(
            "ICS URL must use HTTPS protocol. Your URL starts with '{}://'.",
            parsed_url.scheme()
        )));
    }

    let domain = parsed_url.host_str().unwrap_or_default();
    if domain.is_empty() {
        return Err(AppError::config(format!(
            "ICS URL must have a valid domain name. The provided URL '{}' does not contain a valid host.",
            ics_url
        )));
    }

    // Reject localhost and local network addresses for security
    if domain == "localhost"
        || domain.starts_with("127.")
        || domain.starts_with("192.168.")
        || domain.starts_with("10.")
        || domain.starts_with("172.16.")
    {
        return Err(AppError::config(
            "ICS URL cannot point to localhost or local network addresses. \
             Please use a publicly accessible calendar URL.",
        ));
    }

    let path = parsed_url.path();
    if !path.to_lowercase().ends_with(".ics") && !path.contains("/calendar") {
        log::warn!(
            "ICS URL path does not appear to be a calendar feed (expected .ics extension or /calendar path): {}",
            ics_url
        );
    }

    Ok(())
}

/// Downloads and parses an external calendar feed.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_events(&self, url: &str, cancel: &CancellationToken) -> AppResult<Vec<ExternalEvent>>;
}

/// Fetches feeds over HTTP, feeding the body to the parser chunk by chunk as
/// it arrives.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: Client,
    deadline: Duration,
}

impl HttpFeedFetcher {
    pub fn new(config: &HttpConfig) -> AppResult<Self> {
        Ok(Self {
            client: config.build_client()?,
            deadline: config.fetch_deadline,
        })
    }

    async fn stream_into_parser(&self, url: &str) -> AppResult<Vec<ExternalEvent>> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::FetchStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut parser = IcsParser::new();
        let mut bytes = 0usize;
        while let Some(chunk) = response.chunk().await? {
            if bytes == 0 && chunk.starts_with(b"<") {
                log::warn!("Feed at {} looks like HTML rather than an ICS file", url);
            }
            bytes += chunk.len();
            parser.feed_chunk(&chunk)?;
        }

        let events = parser.finish()?;
        log::debug!("Read {} bytes and {} events from feed", bytes, events.len());
        Ok(events)
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch_events(&self, url: &str, cancel: &CancellationToken) -> AppResult<Vec<ExternalEvent>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            result = tokio::time::timeout(self.deadline, self.stream_into_parser(url)) => {
                result.map_err(|_| AppError::timeout(format!(
                    "Feed fetch did not finish within {}s",
                    self.deadline.as_secs()
                )))?
            }
        }
    }
}
