//! Bluesky via the public AppView XRPC endpoints (no authentication).

use std::sync::Arc;

use async_trait::async_trait;
use mosaic_core::PlatformId;
use serde::{Deserialize, Serialize};

use super::{clean_handle, PlatformClient};
use crate::error::ExtractError;
use crate::http::HttpClient;
use crate::pagination::{paginate, Page};
use crate::persist::extraction_timestamp;
use crate::reporter::Reporter;

const DEFAULT_BASE_URL: &str = "https://public.api.bsky.app";
const FEED_PAGE_SIZE: &str = "100";
const POST_CAP: usize = 200;

#[derive(Debug, Deserialize)]
struct ResolveHandleResponse {
    did: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiProfile {
    handle: String,
    display_name: Option<String>,
    description: Option<String>,
    followers_count: u64,
    follows_count: u64,
    posts_count: u64,
}

#[derive(Debug, Deserialize)]
struct AuthorFeedResponse {
    #[serde(default)]
    feed: Vec<FeedItem>,
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    #[serde(default)]
    post: ApiPost,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiPost {
    uri: String,
    author: ApiAuthor,
    record: ApiRecord,
    reply_count: u64,
    repost_count: u64,
    like_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiAuthor {
    handle: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiRecord {
    text: String,
    created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlueskyProfile {
    pub handle: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub followers_count: u64,
    pub follows_count: u64,
    pub posts_count: u64,
    pub profile_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlueskyPost {
    pub text: String,
    pub created_at: Option<String>,
    pub reply_count: u64,
    pub repost_count: u64,
    pub like_count: u64,
    pub url: String,
}

impl From<ApiPost> for BlueskyPost {
    fn from(post: ApiPost) -> Self {
        let rkey = post.uri.rsplit('/').next().unwrap_or_default();
        let url = format!("https://bsky.app/profile/{}/post/{rkey}", post.author.handle);
        Self {
            text: post.record.text,
            created_at: post.record.created_at,
            reply_count: post.reply_count,
            repost_count: post.repost_count,
            like_count: post.like_count,
            url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlueskyDocument {
    pub profile: BlueskyProfile,
    pub posts: Vec<BlueskyPost>,
    pub extraction_date: String,
}

/// Handles tried in order: the literal handle, then, only for bare names,
/// `{name}.bsky.social` and `{name}.com`.
#[must_use]
pub fn handle_variants(raw: &str) -> Vec<String> {
    let handle = clean_handle(raw).replace('@', "");
    let mut variants = vec![handle.clone()];
    if !handle.contains('.') {
        variants.push(format!("{handle}.bsky.social"));
        variants.push(format!("{handle}.com"));
    }
    variants
}

pub struct BlueskyClient {
    http: HttpClient,
    reporter: Arc<dyn Reporter>,
    base_url: String,
}

impl BlueskyClient {
    #[must_use]
    pub fn new(http: HttpClient, reporter: Arc<dyn Reporter>) -> Self {
        Self::with_base_url(http, reporter, DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(http: HttpClient, reporter: Arc<dyn Reporter>, base_url: &str) -> Self {
        Self {
            http,
            reporter,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{method}", self.base_url)
    }

    /// First variant that resolves to a DID wins.
    async fn resolve(&self, raw: &str) -> Result<(String, String), ExtractError> {
        let url = self.xrpc("com.atproto.identity.resolveHandle");
        for handle in handle_variants(raw) {
            self.reporter.progress(&format!("Trying: {handle}"));
            match self
                .http
                .get_json::<ResolveHandleResponse>(
                    &url,
                    &[("handle", handle.clone())],
                    &format!("Bluesky handle {handle}"),
                )
                .await
            {
                Ok(ResolveHandleResponse { did: Some(did) }) if !did.is_empty() => {
                    self.reporter.success(&format!("Handle resolved: {handle}"));
                    return Ok((handle, did));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(platform = "bluesky", handle = %handle, error = %e, "handle variant did not resolve"),
            }
        }
        Err(ExtractError::NotFound {
            what: format!("Bluesky handle {}", clean_handle(raw)),
        })
    }

    async fn profile(&self, did: &str) -> Result<BlueskyProfile, ExtractError> {
        let profile: ApiProfile = self
            .http
            .get_json(
                &self.xrpc("app.bsky.actor.getProfile"),
                &[("actor", did.to_string())],
                &format!("Bluesky profile {did}"),
            )
            .await?;
        Ok(BlueskyProfile {
            profile_url: format!("https://bsky.app/profile/{}", profile.handle),
            handle: profile.handle,
            display_name: profile.display_name,
            description: profile.description,
            followers_count: profile.followers_count,
            follows_count: profile.follows_count,
            posts_count: profile.posts_count,
        })
    }

    async fn posts(&self, did: &str) -> Vec<BlueskyPost> {
        self.reporter
            .info(&format!("Fetching up to {POST_CAP} posts..."));
        let url = self.xrpc("app.bsky.feed.getAuthorFeed");
        let fetched = std::sync::atomic::AtomicUsize::new(0);

        let collected = paginate(
            POST_CAP,
            self.http.settings().page_delay,
            None::<String>,
            |cursor| {
                let url = &url;
                let fetched = &fetched;
                async move {
                    let mut params = vec![
                        ("actor", did.to_string()),
                        ("limit", FEED_PAGE_SIZE.to_string()),
                    ];
                    if let Some(cursor) = cursor {
                        params.push(("cursor", cursor));
                    }
                    let response: AuthorFeedResponse = self
                        .http
                        .get_json(url, &params, &format!("Bluesky feed of {did}"))
                        .await?;
                    let posts: Vec<BlueskyPost> = response
                        .feed
                        .into_iter()
                        .map(|item| BlueskyPost::from(item.post))
                        .collect();
                    let so_far = fetched.fetch_add(posts.len(), std::sync::atomic::Ordering::Relaxed)
                        + posts.len();
                    self.reporter
                        .progress(&format!("{}/{POST_CAP} posts", so_far.min(POST_CAP)));
                    let next = response.cursor.filter(|c| !c.is_empty());
                    Ok(Page::new(posts, next))
                }
            },
        )
        .await;

        if let Some(e) = &collected.error {
            self.reporter.warning(&format!(
                "Post retrieval stopped early after {} post(s): {e}",
                collected.items.len()
            ));
        }
        self.reporter
            .success(&format!("{} posts retrieved", collected.items.len()));
        collected.items
    }

    /// # Errors
    ///
    /// Fails when no handle variant resolves or the profile cannot be fetched.
    pub async fn fetch_document(&self, handle: &str) -> Result<BlueskyDocument, ExtractError> {
        self.reporter
            .header(&format!("{} BLUESKY EXTRACTOR", PlatformId::Bluesky.icon()));
        self.reporter
            .step(&format!("Target: {}", clean_handle(handle)));

        let (_, did) = self.resolve(handle).await?;
        let profile = self.profile(&did).await?;
        self.reporter.success(&format!(
            "Profile retrieved: {} posts, {} followers, {} following",
            profile.posts_count, profile.followers_count, profile.follows_count
        ));
        let posts = self.posts(&did).await;

        Ok(BlueskyDocument {
            profile,
            posts,
            extraction_date: extraction_timestamp(),
        })
    }
}

#[async_trait]
impl PlatformClient for BlueskyClient {
    fn platform(&self) -> PlatformId {
        PlatformId::Bluesky
    }

    async fn extract(&self, identity: &str) -> Result<serde_json::Value, ExtractError> {
        let document = self.fetch_document(identity).await?;
        Ok(serde_json::to_value(document)?)
    }
}
