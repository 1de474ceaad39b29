//! One client per supported platform, behind the [`PlatformClient`] trait.

pub mod bluesky;
pub mod github;
pub mod mastodon;
pub mod medium;
pub mod reddit;
pub mod stackoverflow;
pub mod telegram;
pub mod youtube;

use std::path::PathBuf;

use async_trait::async_trait;
use mosaic_core::PlatformId;

use crate::error::ExtractError;
use crate::persist::ResultsStore;

pub use bluesky::BlueskyClient;
pub use github::GithubClient;
pub use mastodon::MastodonClient;
pub use medium::MediumClient;
pub use reddit::RedditClient;
pub use stackoverflow::StackOverflowClient;
pub use telegram::TelegramClient;
pub use youtube::YoutubeClient;

/// Shared extraction lifecycle: resolve the identity, fetch the profile
/// section, fetch each secondary collection, assemble one document.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform(&self) -> PlatformId;

    /// Build the normalized document without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Unresolved identity, missing credentials or a failed profile section.
    /// Secondary collection failures degrade to empty collections instead.
    async fn extract(&self, identity: &str) -> Result<serde_json::Value, ExtractError>;

    /// Extract and persist. Performs exactly one write, and only on success.
    ///
    /// # Errors
    ///
    /// Anything from [`Self::extract`], plus storage failures.
    async fn run(&self, identity: &str, store: &ResultsStore) -> Result<PathBuf, ExtractError> {
        let document = self.extract(identity).await?;
        store.save(self.platform(), identity, &document).await
    }
}

/// Strip whitespace and a leading `@` from a user-supplied handle.
pub(crate) fn clean_handle(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}

/// Log and report a secondary-collection failure, yielding the empty fallback.
pub(crate) fn degrade<T>(
    reporter: &dyn crate::reporter::Reporter,
    platform: PlatformId,
    section: &str,
    error: &ExtractError,
) -> Vec<T> {
    tracing::warn!(platform = %platform, section, error = %error, "section unavailable");
    reporter.warning(&format!("Could not fetch {section}: {error}"));
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_handle_strips_at_and_whitespace() {
        assert_eq!(clean_handle("  @octocat "), "octocat");
        assert_eq!(clean_handle("octocat"), "octocat");
        assert_eq!(clean_handle("@@x"), "@x");
    }
}
