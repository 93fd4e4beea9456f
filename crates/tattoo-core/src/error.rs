//! Error type shared by the prompt, model, and storage layers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// All errors that can occur while turning an upload into a generated tattoo.
#[derive(Debug, Error)]
pub enum CoreError {
    /// API key rejected by the model provider.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The model provider answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// The prompt or images were blocked by the provider's safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The provider answered with a body we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An uploaded file is not a readable image.
    #[error("cannot read {what} as an image: {source}")]
    InvalidImage {
        what: &'static str,
        #[source]
        source: image::ImageError,
    },

    /// Re-encoding an image to PNG failed.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// Writing a generated image to the output directory failed.
    #[error("failed to save generated image to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O error (e.g. listing the output directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Returns `true` when the failure originates from the remote model
    /// rather than from the caller's input or the local filesystem.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Auth(_)
                | Self::Api { .. }
                | Self::RateLimited { .. }
                | Self::ContentBlocked(_)
                | Self::UnexpectedResponse(_)
                | Self::Network(_)
        )
    }

    /// Returns `true` when the caller sent something we cannot use.
    pub fn is_client_input(&self) -> bool {
        matches!(self, Self::InvalidImage { .. })
    }
}

/// Result alias for tattoo-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
