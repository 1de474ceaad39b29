//! Shared domain types for the MOSAIC workspace: the platform catalogue,
//! extraction targets, credentials, and environment-driven configuration.

pub mod app_config;
pub mod config;
pub mod credentials;
pub mod platform;
pub mod target;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use credentials::{
    load_credentials, GithubCredentials, MastodonCredentials, PlatformCredentials,
    StackOverflowCredentials, TelegramCredentials, YoutubeCredentials,
};
pub use platform::{estimate_duration, parse_platform_selection, PlatformId};
pub use target::{build_targets, ExtractionTarget, IdentityInput};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read credentials file {path}: {source}")]
    CredentialsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse credentials file: {0}")]
    CredentialsFileParse(#[from] serde_yaml::Error),

    #[error("invalid platform selection \"{input}\": use platform numbers (1-8) or names, separated by commas")]
    InvalidPlatformSelection { input: String },

    #[error("validation error: {0}")]
    Validation(String),
}
