//! Credential lifecycle
//!
//! NoCredential -> Loaded -> (Valid | Refreshing | NeedsConsent) -> Valid.
//! Only one acquisition runs at a time; concurrent callers wait on the lock
//! and then see the cached result.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::credential::{Credential, CredentialStore};
use crate::oauth::AuthFlow;
use crate::{CalendarError, Result};

/// Where acquisition currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialState {
    NoCredential,
    Loaded(Credential),
    Refreshing(Credential),
    NeedsConsent,
    Valid(Credential),
}

/// Read-only view of the stored credential
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialStatus {
    Missing,
    Valid { expiry: Option<DateTime<Utc>> },
    Expired { refreshable: bool },
}

/// Produces a valid access token, persisting anything newly obtained
pub struct CredentialManager {
    store: CredentialStore,
    flow: Arc<dyn AuthFlow>,
    cached: Mutex<Option<Credential>>,
}

impl CredentialManager {
    pub fn new(store: CredentialStore, flow: Arc<dyn AuthFlow>) -> Self {
        Self {
            store,
            flow,
            cached: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Current bearer token
    pub async fn access_token(&self) -> Result<String> {
        Ok(self.credential().await?.token)
    }

    /// A credential that is valid right now
    pub async fn credential(&self) -> Result<Credential> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            if credential.is_valid() {
                return Ok(credential.clone());
            }
        }

        let mut state = match cached.take() {
            Some(credential) => CredentialState::Loaded(credential),
            None => CredentialState::NoCredential,
        };

        let credential = loop {
            state = match state {
                CredentialState::NoCredential => match self.store.load().await {
                    Some(credential) => CredentialState::Loaded(credential),
                    None => CredentialState::NeedsConsent,
                },
                CredentialState::Loaded(credential) => {
                    if credential.is_valid() {
                        debug!("Stored calendar credential is still valid");
                        *cached = Some(credential.clone());
                        return Ok(credential);
                    } else if credential.can_refresh() {
                        CredentialState::Refreshing(credential)
                    } else {
                        CredentialState::NeedsConsent
                    }
                }
                CredentialState::Refreshing(credential) => {
                    match self.flow.refresh(&credential).await {
                        Ok(refreshed) => CredentialState::Valid(refreshed),
                        Err(CalendarError::Auth(reason)) => {
                            warn!("Refresh rejected, asking for consent again: {}", reason);
                            CredentialState::NeedsConsent
                        }
                        Err(e) => return Err(e),
                    }
                }
                CredentialState::NeedsConsent => {
                    info!("Calendar access needs user consent");
                    CredentialState::Valid(self.flow.consent().await?)
                }
                CredentialState::Valid(credential) => break credential,
            };
        };

        if let Err(e) = self.store.save(&credential).await {
            warn!("Failed to persist calendar credential: {}", e);
        }
        *cached = Some(credential.clone());
        Ok(credential)
    }

    /// Stored credential status, without refreshing or prompting
    pub async fn status(&self) -> CredentialStatus {
        let credential = match self.cached.lock().await.clone() {
            Some(credential) => Some(credential),
            None => self.store.load().await,
        };

        match credential {
            None => CredentialStatus::Missing,
            Some(c) if c.is_valid() => CredentialStatus::Valid { expiry: c.expiry },
            Some(c) => CredentialStatus::Expired {
                refreshable: c.can_refresh(),
            },
        }
    }
}
