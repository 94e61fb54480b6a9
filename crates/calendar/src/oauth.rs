//! OAuth 2.0 flows against Google's token endpoint
//!
//! `refresh` trades a refresh token for a new access token. `consent` runs
//! the installed-app flow: a loopback listener on an ephemeral port receives
//! the authorization code, which is then exchanged for tokens.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::credential::{ClientSecrets, Credential, TokenResponse};
use crate::{CalendarError, Result, CALENDAR_SCOPE};

const CONSENT_DONE_PAGE: &str =
    "The authentication flow has completed. You may close this window.";

/// Ways to obtain a usable credential
#[async_trait]
pub trait AuthFlow: Send + Sync {
    /// Exchange the credential's refresh token for a new access token
    async fn refresh(&self, credential: &Credential) -> Result<Credential>;

    /// Ask the user to grant access interactively
    async fn consent(&self) -> Result<Credential>;
}

type AuthorizePrompt = Arc<dyn Fn(&str) + Send + Sync>;

/// Google OAuth for installed applications
pub struct GoogleOAuth {
    http: Client,
    secrets_path: PathBuf,
    scopes: Vec<String>,
    consent_timeout: Duration,
    prompt: AuthorizePrompt,
}

impl GoogleOAuth {
    pub fn new(secrets_path: impl Into<PathBuf>, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            secrets_path: secrets_path.into(),
            scopes: vec![CALENDAR_SCOPE.to_string()],
            consent_timeout: Duration::from_secs(300),
            prompt: Arc::new(|url| {
                eprintln!("Please visit this URL to authorize this application: {}", url)
            }),
        })
    }

    pub fn from_config(config: &concierge_config::CalendarConfig) -> Result<Self> {
        Self::new(
            config.client_secrets_path(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Replace how the authorization URL is shown to the user
    pub fn with_prompt(mut self, prompt: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }

    pub fn with_consent_timeout(mut self, timeout: Duration) -> Self {
        self.consent_timeout = timeout;
        self
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Consent page URL for the given redirect and anti-forgery state
    pub fn authorization_url(
        secrets: &ClientSecrets,
        scopes: &[String],
        redirect_uri: &str,
        state: &str,
    ) -> Result<Url> {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| CalendarError::InvalidResponse(format!("bad auth_uri: {}", e)))
    }

    async fn token_request(&self, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self.http.post(token_uri).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    let error = v["error"].as_str()?.to_string();
                    Some(match v["error_description"].as_str() {
                        Some(desc) => format!("{}: {}", error, desc),
                        None => error,
                    })
                })
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(CalendarError::Auth(reason));
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential> {
        let tokens = self
            .token_request(
                &secrets.token_uri,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                    ("redirect_uri", redirect_uri),
                ],
            )
            .await?;

        Ok(tokens.into_credential(
            &secrets.token_uri,
            &secrets.client_id,
            &secrets.client_secret,
            &self.scopes,
            None,
        ))
    }
}

#[async_trait]
impl AuthFlow for GoogleOAuth {
    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| CalendarError::Auth("credential has no refresh token".to_string()))?;

        info!("Refreshing calendar access token");
        let tokens = self
            .token_request(
                &credential.token_uri,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                    ("client_id", credential.client_id.as_str()),
                    ("client_secret", credential.client_secret.as_str()),
                ],
            )
            .await?;

        Ok(tokens.into_credential(
            &credential.token_uri,
            &credential.client_id,
            &credential.client_secret,
            &credential.scopes,
            Some(refresh_token),
        ))
    }

    async fn consent(&self) -> Result<Credential> {
        let secrets = ClientSecrets::load(&self.secrets_path).await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}/", port);
        let state = Uuid::new_v4().simple().to_string();

        let url = Self::authorization_url(&secrets, &self.scopes, &redirect_uri, &state)?;
        info!("Waiting for calendar consent on port {}", port);
        (self.prompt)(url.as_str());

        let code = tokio::time::timeout(self.consent_timeout, wait_for_code(&listener, &state))
            .await
            .map_err(|_| CalendarError::ConsentTimeout(self.consent_timeout))??;

        self.exchange_code(&secrets, &code, &redirect_uri).await
    }
}

/// Accept redirects until one carries the authorization code
pub(crate) async fn wait_for_code(listener: &TcpListener, expected_state: &str) -> Result<String> {
    loop {
        let (mut stream, peer) = listener.accept().await?;
        debug!("Consent callback connection from {}", peer);

        let target = match read_request_target(&mut stream).await {
            Ok(target) => target,
            Err(e) => {
                warn!("Unreadable consent callback: {}", e);
                continue;
            }
        };

        match parse_callback(&target, expected_state) {
            Ok(Some(code)) => {
                respond(&mut stream, "200 OK", CONSENT_DONE_PAGE).await;
                return Ok(code);
            }
            // favicon and other stray requests
            Ok(None) => respond(&mut stream, "404 Not Found", "Not found").await,
            Err(e) => {
                respond(&mut stream, "400 Bad Request", &e.to_string()).await;
                return Err(e);
            }
        }
    }
}

async fn read_request_target(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // drain headers so closing the socket does not reset the browser
    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header).await? == 0 || header.trim().is_empty() {
            break;
        }
    }

    // GET /?code=...&state=... HTTP/1.1
    request_line
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "empty request line"))
}

/// Code from a callback target; `None` when the request carries no OAuth reply
pub(crate) fn parse_callback(target: &str, expected_state: &str) -> Result<Option<String>> {
    let url = Url::parse(&format!("http://localhost{}", target))
        .map_err(|e| CalendarError::InvalidResponse(format!("bad callback: {}", e)))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(CalendarError::ConsentDenied(error));
    }

    match code {
        None => Ok(None),
        Some(code) if state.as_deref() == Some(expected_state) => Ok(Some(code)),
        Some(_) => Err(CalendarError::StateMismatch),
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let html = format!("<html><body><p>{}</p></body></html>", body);
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        html.len(),
        html
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("Failed to answer consent callback: {}", e);
    }
    let _ = stream.shutdown().await;
}
