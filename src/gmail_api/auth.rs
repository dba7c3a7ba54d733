use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, Credentials};
use crate::error::{AuthFailure, Error, Result};
use crate::gmail_api::client::{GmailClient, GMAIL_API_BASE};

/// Full mailbox access: read, send and label changes.
pub const GMAIL_SCOPE: &str = "https://mail.google.com/";

// Treat tokens this close to expiry as already expired
const EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Token {
    /// A token without a known expiry is never considered expired locally;
    /// the provider gets to decide.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_empty()
            || self
                .expiry
                .is_some_and(|expiry| expiry - Duration::seconds(EXPIRY_SKEW_SECONDS) <= now)
    }
}

// Token endpoint response for both code exchange and refresh
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh_token: Option<&str>) -> Result<Token> {
        let expiry = match self.expires_in {
            Some(secs) => Some(
                Duration::try_seconds(secs)
                    .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        Error::auth(
                            AuthFailure::MalformedCredentials,
                            format!("expires_in out of range: {}", secs),
                        )
                    })?,
            ),
            None => None,
        };

        Ok(Token {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh_token.map(str::to_string)),
            expiry,
            token_type: self.token_type,
            scope: self.scope,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

// Define a trait for the operator prompt to allow mocking
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodePrompt: Send + Sync {
    /// Shows the authorization URL and waits for the one-time code.
    async fn request_code(&self, auth_url: &str) -> Result<String>;
}

/// Prompts on the terminal.
pub struct StdinPrompt;

#[async_trait]
impl CodePrompt for StdinPrompt {
    async fn request_code(&self, auth_url: &str) -> Result<String> {
        let io_error = |e: std::io::Error| Error::auth(AuthFailure::InvalidGrant, e);

        let mut stdout = tokio::io::stdout();
        let banner = format!(
            "Authorize this app by visiting this url: {}\nEnter the code from that page here: ",
            auth_url
        );
        stdout.write_all(banner.as_bytes()).await.map_err(io_error)?;
        stdout.flush().await.map_err(io_error)?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(io_error)?;

        let code = line.trim();
        if code.is_empty() {
            return Err(Error::auth(
                AuthFailure::InvalidGrant,
                "no authorization code entered",
            ));
        }
        Ok(code.to_string())
    }
}

/// Refuses to prompt; for unattended runs that rely on a provisioned refresh
/// token.
pub struct NoPrompt;

#[async_trait]
impl CodePrompt for NoPrompt {
    async fn request_code(&self, _auth_url: &str) -> Result<String> {
        Err(Error::auth(
            AuthFailure::InvalidGrant,
            "stored token is unusable and interactive authorization is disabled",
        ))
    }
}

/// Turns stored credentials into a [`GmailClient`] holding a usable token.
pub struct AuthSession<P> {
    store: CredentialStore,
    prompt: P,
    http: reqwest::Client,
    api_base: String,
}

impl<P: CodePrompt> AuthSession<P> {
    pub fn new(store: CredentialStore, prompt: P) -> Self {
        Self {
            store,
            prompt,
            http: reqwest::Client::new(),
            api_base: GMAIL_API_BASE.to_string(),
        }
    }

    /// Points the resulting client (and the token probe) at another API root.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub async fn authenticate(&self) -> Result<GmailClient> {
        let credentials = self.store.load_credentials().await?;

        let token = match self.store.load_token().await {
            Some(token) => self.validate_or_refresh(&credentials, token).await?,
            None => {
                info!("No stored token, starting interactive authorization");
                self.interactive_grant(&credentials).await?
            }
        };

        Ok(self.client_for(token))
    }

    fn client_for(&self, token: Token) -> GmailClient {
        GmailClient::new(self.http.clone(), token).with_base_url(self.api_base.clone())
    }

    async fn validate_or_refresh(&self, credentials: &Credentials, token: Token) -> Result<Token> {
        if token.is_expired_at(Utc::now()) {
            info!("Stored access token has expired");
        } else if self.client_for(token.clone()).accepts_token().await? {
            debug!("Stored access token accepted");
            return Ok(token);
        } else {
            info!("Stored access token was rejected by the provider");
        }

        let Some(refresh_token) = token.refresh_token.as_deref() else {
            warn!("Stored token has no refresh token");
            return self.interactive_grant(credentials).await;
        };

        match self.refresh(credentials, refresh_token).await {
            Ok(refreshed) => {
                info!("Access token refreshed");
                self.persist(&refreshed).await;
                Ok(refreshed)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, falling back to interactive authorization");
                self.interactive_grant(credentials).await
            }
        }
    }

    async fn interactive_grant(&self, credentials: &Credentials) -> Result<Token> {
        let auth_url = authorization_url(credentials)?;
        let code = self.prompt.request_code(auth_url.as_str()).await?;

        let response = self
            .token_request(
                credentials,
                &[
                    ("code", code.as_str()),
                    ("client_id", credentials.client_id.as_str()),
                    ("client_secret", credentials.client_secret.as_str()),
                    ("redirect_uri", credentials.redirect_uri.as_str()),
                    ("grant_type", "authorization_code"),
                ],
            )
            .await?;

        let token = response.into_token(None)?;
        self.persist(&token).await;
        Ok(token)
    }

    async fn refresh(&self, credentials: &Credentials, refresh_token: &str) -> Result<Token> {
        let response = self
            .token_request(
                credentials,
                &[
                    ("refresh_token", refresh_token),
                    ("client_id", credentials.client_id.as_str()),
                    ("client_secret", credentials.client_secret.as_str()),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;
        response.into_token(Some(refresh_token))
    }

    async fn token_request(
        &self,
        credentials: &Credentials,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&credentials.token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::auth(AuthFailure::Network, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<TokenErrorResponse>(&text) {
                Ok(body) => match body.error_description {
                    Some(description) => format!("{}: {}", body.error, description),
                    None => body.error,
                },
                Err(_) => format!("{}: {}", status, text),
            };
            let reason = if status.is_client_error() {
                AuthFailure::InvalidGrant
            } else {
                AuthFailure::Network
            };
            return Err(Error::auth(reason, detail));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::auth(AuthFailure::MalformedCredentials, e))
    }

    // The in-memory token stays usable when the write fails
    async fn persist(&self, token: &Token) {
        if let Err(e) = self.store.save_token(token).await {
            warn!(error = %e, "Continuing with in-memory token only");
        }
    }
}

/// Consent URL for offline access to the full mailbox.
pub fn authorization_url(credentials: &Credentials) -> Result<reqwest::Url> {
    reqwest::Url::parse_with_params(
        &credentials.auth_uri,
        &[
            ("client_id", credentials.client_id.as_str()),
            ("redirect_uri", credentials.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", GMAIL_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| Error::auth(AuthFailure::MalformedCredentials, e))
}
