//! File-backed storage for the OAuth client secret, the user token and the
//! reply template.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gmail_api::auth::Token;

pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
pub const DEFAULT_TOKEN_PATH: &str = "token.json";
pub const DEFAULT_TEMPLATE_PATH: &str = "email.html";

/// OAuth client configuration from the Google console download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
}

impl Credentials {
    /// Parses the console JSON (`installed` or `web` section).
    pub fn from_json(content: &[u8], path: &Path) -> Result<Self> {
        let secret = yup_oauth2::parse_application_secret(content)
            .map_err(|e| Error::config(path, e))?;

        let redirect_uri = secret
            .redirect_uris
            .first()
            .cloned()
            .ok_or_else(|| Error::config(path, "redirect_uris is empty"))?;

        if secret.client_id.is_empty() || secret.client_secret.is_empty() {
            return Err(Error::config(path, "client_id and client_secret are required"));
        }

        Ok(Self {
            client_id: secret.client_id,
            client_secret: secret.client_secret,
            redirect_uri,
            auth_uri: secret.auth_uri,
            token_uri: secret.token_uri,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIALS_PATH, DEFAULT_TOKEN_PATH)
    }
}

impl CredentialStore {
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    pub async fn load_credentials(&self) -> Result<Credentials> {
        let content = tokio::fs::read(&self.credentials_path)
            .await
            .map_err(|e| Error::config(&self.credentials_path, e))?;
        Credentials::from_json(&content, &self.credentials_path)
    }

    /// Returns `None` for a missing or unreadable token file; both mean "run
    /// the grant again".
    pub async fn load_token(&self) -> Option<Token> {
        let content = match tokio::fs::read(&self.token_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.token_path.display(), "No stored token");
                return None;
            }
            Err(e) => {
                warn!(path = %self.token_path.display(), error = %e, "Failed to read stored token");
                return None;
            }
        };

        match serde_json::from_slice(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.token_path.display(), error = %e, "Ignoring malformed stored token");
                None
            }
        }
    }

    pub async fn save_token(&self, token: &Token) -> Result<()> {
        let persistence_error = |source| Error::Persistence {
            path: self.token_path.clone(),
            source,
        };

        let json = serde_json::to_vec_pretty(token)
            .map_err(|e| persistence_error(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        tokio::fs::write(&self.token_path, json)
            .await
            .map_err(persistence_error)?;

        info!("Token stored to {}", self.token_path.display());
        Ok(())
    }
}

/// Reads the reply body verbatim.
pub async fn load_template(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| Error::config(path, e))
}
