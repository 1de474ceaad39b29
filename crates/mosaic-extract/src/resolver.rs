//! Builds the client for one platform from credentials and shared settings.

use std::sync::Arc;

use mosaic_core::{PlatformCredentials, PlatformId};

use crate::error::ExtractError;
use crate::http::{ClientSettings, HttpClient};
use crate::platforms::{
    BlueskyClient, GithubClient, MastodonClient, MediumClient, PlatformClient, RedditClient,
    StackOverflowClient, YoutubeClient,
};
use crate::reporter::Reporter;
use crate::selection::CandidatePicker;

/// Constructs a fresh client each time a platform starts running.
pub trait ClientFactory: Send + Sync {
    /// # Errors
    ///
    /// [`ExtractError::MissingCredentials`] or [`ExtractError::MissingDependency`]
    /// when the platform cannot run; no request has been sent at that point.
    fn build(&self, platform: PlatformId) -> Result<Box<dyn PlatformClient>, ExtractError>;
}

pub struct DefaultClientFactory {
    credentials: PlatformCredentials,
    settings: ClientSettings,
    reporter: Arc<dyn Reporter>,
    picker: Arc<dyn CandidatePicker>,
}

impl DefaultClientFactory {
    #[must_use]
    pub fn new(
        credentials: PlatformCredentials,
        settings: ClientSettings,
        reporter: Arc<dyn Reporter>,
        picker: Arc<dyn CandidatePicker>,
    ) -> Self {
        Self {
            credentials,
            settings,
            reporter,
            picker,
        }
    }

    fn youtube_key(&self) -> Result<String, ExtractError> {
        self.credentials
            .youtube
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ExtractError::MissingCredentials {
                platform: PlatformId::Youtube,
                hint: "set youtube.api_key in config.yaml or YOUTUBE_API_KEY".to_string(),
            })
    }

    fn telegram_keys(&self) -> Result<(i32, String), ExtractError> {
        let telegram = &self.credentials.telegram;
        match (telegram.api_id, telegram.api_hash.as_deref()) {
            (Some(id), Some(hash)) if !hash.trim().is_empty() => Ok((id, hash.to_string())),
            _ => Err(ExtractError::MissingCredentials {
                platform: PlatformId::Telegram,
                hint: "set telegram.api_id and telegram.api_hash (https://my.telegram.org)"
                    .to_string(),
            }),
        }
    }

    #[cfg(feature = "telegram")]
    fn telegram(&self) -> Result<Box<dyn PlatformClient>, ExtractError> {
        use crate::platforms::telegram::mtproto::MtprotoSession;
        use crate::platforms::TelegramClient;

        let (api_id, api_hash) = self.telegram_keys()?;
        let session = MtprotoSession::new(
            api_id,
            api_hash,
            self.credentials.telegram.phone.clone(),
            &self.credentials.telegram.session_name,
        );
        Ok(Box::new(TelegramClient::new(
            Box::new(session),
            Arc::clone(&self.reporter),
        )))
    }

    #[cfg(not(feature = "telegram"))]
    fn telegram(&self) -> Result<Box<dyn PlatformClient>, ExtractError> {
        self.telegram_keys()?;
        Err(ExtractError::MissingDependency {
            platform: PlatformId::Telegram,
            hint: "rebuild with `--features telegram` to enable the MTProto backend".to_string(),
        })
    }
}

impl ClientFactory for DefaultClientFactory {
    fn build(&self, platform: PlatformId) -> Result<Box<dyn PlatformClient>, ExtractError> {
        // Credential checks run before the HTTP client exists.
        match platform {
            PlatformId::Youtube => {
                self.youtube_key()?;
            }
            PlatformId::Telegram => return self.telegram(),
            _ => {}
        }

        let http = HttpClient::new(self.settings.clone())?;
        let reporter = Arc::clone(&self.reporter);
        let client: Box<dyn PlatformClient> = match platform {
            PlatformId::StackOverflow => Box::new(StackOverflowClient::new(
                http,
                reporter,
                Arc::clone(&self.picker),
                self.credentials.stackoverflow.api_key.clone(),
            )),
            PlatformId::Youtube => Box::new(YoutubeClient::new(
                http,
                reporter,
                Arc::clone(&self.picker),
                self.youtube_key()?,
            )),
            PlatformId::Github => Box::new(GithubClient::new(
                http,
                reporter,
                self.credentials.github.token.clone(),
            )),
            PlatformId::Bluesky => Box::new(BlueskyClient::new(http, reporter)),
            PlatformId::Mastodon => Box::new(MastodonClient::new(
                http,
                reporter,
                &self.credentials.mastodon.instance,
            )),
            PlatformId::Reddit => Box::new(RedditClient::new(http, reporter)),
            PlatformId::Medium => Box::new(MediumClient::new(http, reporter)),
            PlatformId::Telegram => return self.telegram(),
        };
        Ok(client)
    }
}
