use mosaic_core::PlatformId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("feed parse error: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),

    #[error("{platform} requires credentials: {hint}")]
    MissingCredentials { platform: PlatformId, hint: String },

    #[error("{platform} support is unavailable: {hint}")]
    MissingDependency { platform: PlatformId, hint: String },

    #[error("username @{username} is not occupied")]
    UsernameNotOccupied { username: String },

    #[error("telegram error: {0}")]
    Telegram(String),

    #[error("I/O error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("platform task panicked: {0}")]
    Panicked(String),
}
