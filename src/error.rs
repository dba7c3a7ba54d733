//! Error taxonomy for a triage run.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why an OAuth grant or refresh failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The provider refused the code or refresh token.
    InvalidGrant,
    /// The token endpoint could not be reached.
    Network,
    /// The provider answered with something that is not a token.
    MalformedCredentials,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthFailure::InvalidGrant => "invalid_grant",
            AuthFailure::Network => "network",
            AuthFailure::MalformedCredentials => "malformed_credentials",
        };
        f.write_str(s)
    }
}

/// Errors that can occur during a run.
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials or template missing/malformed. Fatal.
    #[error("Configuration error in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// Grant or refresh failed. Fatal.
    #[error("Authentication failed ({reason}): {detail}")]
    Auth { reason: AuthFailure, detail: String },

    /// The configured label does not exist in the mailbox.
    #[error("Label not found: {0}")]
    LabelNotFound(String),

    /// A discovered message vanished before it could be fetched.
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// The token file could not be written.
    #[error("Failed to persist token to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other remote call failure.
    #[error("{operation} failed: {detail}")]
    Transport { operation: String, detail: String },

    /// A reply could not be built from the source message.
    #[error("Cannot compose reply: {0}")]
    Compose(String),
}

impl Error {
    pub fn config(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Error::Config {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn auth(reason: AuthFailure, detail: impl fmt::Display) -> Self {
        Error::Auth {
            reason,
            detail: detail.to_string(),
        }
    }

    pub fn transport(operation: &str, detail: impl fmt::Display) -> Self {
        Error::Transport {
            operation: operation.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Whether this error ends the whole run rather than a single message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::Auth { .. } | Error::Transport { .. }
        )
    }

    /// Process exit code for an error that reached the top level.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config { .. } => 2,
            Error::Auth { .. } => 3,
            Error::Transport { .. } => 4,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
