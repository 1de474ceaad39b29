//! Per-platform credentials loaded from `config.yaml` with env-var overrides.

use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

pub const DEFAULT_MASTODON_INSTANCE: &str = "infosec.exchange";
pub const DEFAULT_TELEGRAM_SESSION: &str = "telegram_session";

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct GithubCredentials {
    pub token: Option<String>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct StackOverflowCredentials {
    pub api_key: Option<String>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct YoutubeCredentials {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MastodonCredentials {
    pub instance: String,
}

impl Default for MastodonCredentials {
    fn default() -> Self {
        Self {
            instance: DEFAULT_MASTODON_INSTANCE.to_string(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TelegramCredentials {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub phone: Option<String>,
    pub session_name: String,
}

impl Default for TelegramCredentials {
    fn default() -> Self {
        Self {
            api_id: None,
            api_hash: None,
            phone: None,
            session_name: DEFAULT_TELEGRAM_SESSION.to_string(),
        }
    }
}

/// All optional platform secrets. Never serialized back out.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformCredentials {
    pub github: GithubCredentials,
    pub stackoverflow: StackOverflowCredentials,
    pub youtube: YoutubeCredentials,
    pub mastodon: MastodonCredentials,
    pub telegram: TelegramCredentials,
}

fn redact<T>(value: Option<&T>) -> Option<&'static str> {
    value.map(|_| "[redacted]")
}

impl std::fmt::Debug for GithubCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubCredentials")
            .field("token", &redact(self.token.as_ref()))
            .finish()
    }
}

impl std::fmt::Debug for StackOverflowCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackOverflowCredentials")
            .field("api_key", &redact(self.api_key.as_ref()))
            .finish()
    }
}

impl std::fmt::Debug for YoutubeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeCredentials")
            .field("api_key", &redact(self.api_key.as_ref()))
            .finish()
    }
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &redact(self.api_hash.as_ref()))
            .field("phone", &redact(self.phone.as_ref()))
            .field("session_name", &self.session_name)
            .finish()
    }
}

impl std::fmt::Debug for PlatformCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCredentials")
            .field("github", &self.github)
            .field("stackoverflow", &self.stackoverflow)
            .field("youtube", &self.youtube)
            .field("mastodon", &self.mastodon)
            .field("telegram", &self.telegram)
            .finish()
    }
}

/// Load credentials from a YAML file.
///
/// A missing file is not an error: every platform then runs without
/// credentials and the ones that need them report it before any request.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_credentials(path: &Path) -> Result<PlatformCredentials, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no credentials file; using empty credentials");
        return Ok(PlatformCredentials::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CredentialsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_credentials(&content)
}

/// Parse credentials YAML. An empty document yields empty credentials and a
/// blank Mastodon instance falls back to the default one.
///
/// # Errors
///
/// Returns [`ConfigError::CredentialsFileParse`] on malformed YAML.
pub fn parse_credentials(content: &str) -> Result<PlatformCredentials, ConfigError> {
    if content.trim().is_empty() {
        return Ok(PlatformCredentials::default());
    }
    let mut credentials: PlatformCredentials = serde_yaml::from_str(content)?;
    if credentials.mastodon.instance.trim().is_empty() {
        credentials.mastodon.instance = DEFAULT_MASTODON_INSTANCE.to_string();
    }
    Ok(credentials)
}

impl PlatformCredentials {
    /// Overlay env-provided secrets on top of file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvVar`] if `TELEGRAM_API_ID` is not an integer.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let non_empty = |var: &str| lookup(var).ok().filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(key) = non_empty("STACKEXCHANGE_API_KEY") {
            self.stackoverflow.api_key = Some(key);
        }
        if let Some(key) = non_empty("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(key);
        }
        if let Some(instance) = non_empty("MASTODON_INSTANCE") {
            self.mastodon.instance = instance;
        }
        if let Some(raw) = non_empty("TELEGRAM_API_ID") {
            let api_id = raw
                .trim()
                .parse::<i32>()
                .map_err(|e| ConfigError::InvalidEnvVar {
                    var: "TELEGRAM_API_ID".to_string(),
                    reason: e.to_string(),
                })?;
            self.telegram.api_id = Some(api_id);
        }
        if let Some(hash) = non_empty("TELEGRAM_API_HASH") {
            self.telegram.api_hash = Some(hash);
        }
        if let Some(phone) = non_empty("TELEGRAM_PHONE") {
            self.telegram.phone = Some(phone);
        }
        Ok(())
    }
}
