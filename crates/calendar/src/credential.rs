//! Stored OAuth credential and client secrets

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{CalendarError, Result};

/// Tokens this close to expiry are treated as expired
const EXPIRY_SKEW_SECS: i64 = 60;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Authorized-user credential, in the same shape Google's client libraries
/// write to `token.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl Credential {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Usable as-is: has a token and it has not expired
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty() && !self.is_expired()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Build a credential, keeping `previous_refresh` when the endpoint
    /// does not rotate the refresh token
    pub(crate) fn into_credential(
        self,
        token_uri: &str,
        client_id: &str,
        client_secret: &str,
        fallback_scopes: &[String],
        previous_refresh: Option<String>,
    ) -> Credential {
        let scopes = match self.scope {
            Some(scope) if !scope.trim().is_empty() => {
                scope.split_whitespace().map(str::to_string).collect()
            }
            _ => fallback_scopes.to_vec(),
        };

        Credential {
            token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            token_uri: token_uri.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scopes,
            expiry: self
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }
}

/// OAuth client registration (`credentials.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse the console download; accepts "installed" and "web" clients
    pub fn from_json(content: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(content)?;
        file.installed.or(file.web).ok_or_else(|| {
            CalendarError::InvalidResponse(
                "client secrets contain neither an installed nor a web client".to_string(),
            )
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CalendarError::MissingClientSecrets(path.to_path_buf()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }
}

/// File-backed credential cache
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored credential, if present and readable
    pub async fn load(&self) -> Option<Credential> {
        if !self.path.exists() {
            return None;
        }

        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str::<Credential>(&content) {
                Ok(credential) => {
                    debug!("Loaded credential from {:?}", self.path);
                    Some(credential)
                }
                Err(e) => {
                    warn!("Ignoring unreadable credential {:?}: {}", self.path, e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read credential {:?}: {}", self.path, e);
                None
            }
        }
    }

    pub async fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(credential)?;
        tokio::fs::write(&self.path, content).await?;
        debug!("Saved credential to {:?}", self.path);
        Ok(())
    }
}
