//! Google Calendar adapter
//!
//! Keeps an OAuth credential on disk, refreshes it or runs the consent flow
//! when needed, and inserts events into a calendar.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod client;
pub mod credential;
pub mod manager;
pub mod oauth;

pub use client::CalendarClient;
pub use credential::{ClientSecrets, Credential, CredentialStore};
pub use manager::{CredentialManager, CredentialState, CredentialStatus};
pub use oauth::{AuthFlow, GoogleOAuth};

/// OAuth scope granting read/write calendar access
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Calendar adapter errors
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("client secrets not found at {0}")]
    MissingClientSecrets(PathBuf),

    #[error("authorization rejected: {0}")]
    Auth(String),

    #[error("consent denied: {0}")]
    ConsentDenied(String),

    #[error("consent callback state mismatch")]
    StateMismatch,

    #[error("no consent received within {0:?}")]
    ConsentTimeout(Duration),

    #[error("calendar API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("invalid calendar api base: {0}")]
    InvalidApiBase(String),

    #[error("calendar request timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, CalendarError>;

/// Event to insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    /// ISO-8601 local date-time
    pub start_time: String,
    /// ISO-8601 local date-time
    pub end_time: String,
}

/// Event as created by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
}

/// Anything that can put an event on a calendar
#[async_trait]
pub trait EventScheduler: Send + Sync {
    async fn create_event(&self, event: NewEvent) -> Result<CreatedEvent>;
}
