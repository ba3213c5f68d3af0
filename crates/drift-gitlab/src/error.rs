//! Error types for drift-gitlab

use drift_core::ClientError;

/// Result type for building a client
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up a GitLab client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The instance URL cannot be used as an API base
    #[error("Invalid GitLab URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// No access token was supplied
    #[error("A GitLab access token is required")]
    MissingToken,

    /// The HTTP client could not be constructed
    #[error("Could not build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Map a failed request to the client error taxonomy
pub(crate) fn transport(error: reqwest::Error) -> ClientError {
    if error.is_decode() {
        ClientError::Decode {
            message: error.to_string(),
        }
    } else {
        ClientError::Transport {
            message: error.to_string(),
        }
    }
}

impl From<Error> for ClientError {
    fn from(error: Error) -> Self {
        match error {
            Error::Http(e) => transport(e),
            other => ClientError::Transport {
                message: other.to_string(),
            },
        }
    }
}
