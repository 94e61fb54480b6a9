//! Calendar v3 events client

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::manager::CredentialManager;
use crate::{CalendarError, CreatedEvent, EventScheduler, NewEvent, Result};

pub struct CalendarClient {
    http: Client,
    api_base: String,
    calendar_id: String,
    time_zone: String,
    timeout: Duration,
    credentials: Arc<CredentialManager>,
}

impl CalendarClient {
    pub fn new(
        api_base: impl Into<String>,
        calendar_id: impl Into<String>,
        time_zone: impl Into<String>,
        timeout: Duration,
        credentials: Arc<CredentialManager>,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            calendar_id: calendar_id.into(),
            time_zone: time_zone.into(),
            timeout,
            credentials,
        })
    }

    pub fn from_config(
        config: &concierge_config::CalendarConfig,
        credentials: Arc<CredentialManager>,
    ) -> Result<Self> {
        Self::new(
            &config.api_base,
            &config.calendar_id,
            &config.time_zone,
            Duration::from_secs(config.timeout_secs),
            credentials,
        )
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// `{api_base}/calendars/{id}/events` with the id as one encoded segment
    pub(crate) fn events_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| CalendarError::InvalidApiBase(format!("{}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::InvalidApiBase(self.api_base.clone()))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        Ok(url)
    }

    fn event_body(&self, event: &NewEvent) -> serde_json::Value {
        json!({
            "summary": event.title,
            "description": event.description,
            "start": { "dateTime": event.start_time, "timeZone": self.time_zone },
            "end": { "dateTime": event.end_time, "timeZone": self.time_zone },
        })
    }

    fn map_request_error(&self, e: reqwest::Error) -> CalendarError {
        if e.is_timeout() {
            CalendarError::Timeout(self.timeout)
        } else {
            CalendarError::Request(e)
        }
    }
}

#[async_trait]
impl EventScheduler for CalendarClient {
    async fn create_event(&self, event: NewEvent) -> Result<CreatedEvent> {
        let token = self.credentials.access_token().await?;
        let url = self.events_url()?;

        debug!("◆ inserting event {:?} into {}", event.title, self.calendar_id);
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&self.event_body(&event))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_request_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = serde_json::from_str(&text)?;
        let id = body["id"]
            .as_str()
            .ok_or_else(|| CalendarError::InvalidResponse("event without id".to_string()))?
            .to_string();
        let html_link = body["htmlLink"].as_str().map(str::to_string);

        info!("Created calendar event {}", id);
        Ok(CreatedEvent { id, html_link })
    }
}
