//! Reddit public JSON listings (`/user/{name}/…json`), no OAuth.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use mosaic_core::PlatformId;
use serde::{Deserialize, Serialize};

use super::{clean_handle, degrade, PlatformClient};
use crate::error::ExtractError;
use crate::http::{encode_segment, HttpClient};
use crate::pagination::{paginate, Page};
use crate::persist::extraction_timestamp;
use crate::reporter::Reporter;

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const LISTING_PAGE_SIZE: &str = "100";
const LISTING_CAP: usize = 200;
const COMMENT_BODY_MAX_CHARS: usize = 500;

/// `about.json` wrapper. `data` is absent for unknown accounts.
#[derive(Debug, Deserialize)]
struct AboutResponse {
    data: Option<AboutData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AboutData {
    name: String,
    created_utc: f64,
    link_karma: i64,
    comment_karma: i64,
    total_karma: i64,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    #[serde(default)]
    data: ThingData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThingData {
    title: String,
    body: String,
    subreddit: String,
    permalink: String,
    score: i64,
    num_comments: u64,
    created_utc: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedditUserInfo {
    pub username: String,
    pub created_utc: f64,
    /// `YYYY-MM-DD`, UTC.
    pub account_created: String,
    pub link_karma: i64,
    pub comment_karma: i64,
    pub total_karma: i64,
    pub profile_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedditPost {
    pub title: String,
    pub subreddit: String,
    pub url: String,
    pub score: i64,
    pub num_comments: u64,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub created: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedditComment {
    /// At most 500 characters.
    pub body: String,
    pub subreddit: String,
    pub url: String,
    pub score: i64,
    pub created: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedditDocument {
    pub user_info: RedditUserInfo,
    pub posts: Vec<RedditPost>,
    pub comments: Vec<RedditComment>,
    pub extraction_date: String,
}

#[allow(clippy::cast_possible_truncation)]
fn format_utc(created_utc: f64, pattern: &str) -> String {
    DateTime::from_timestamp(created_utc.trunc() as i64, 0)
        .map(|dt| dt.format(pattern).to_string())
        .unwrap_or_default()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub struct RedditClient {
    http: HttpClient,
    reporter: Arc<dyn Reporter>,
    base_url: String,
}

impl RedditClient {
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

    async fn user_info(&self, username: &str) -> Result<RedditUserInfo, ExtractError> {
        let about: AboutResponse = self
            .http
            .get_json(
                &format!("{}/user/{}/about.json", self.base_url, encode_segment(username)),
                &[],
                &format!("Reddit user u/{username}"),
            )
            .await?;
        let data = about.data.ok_or_else(|| ExtractError::NotFound {
            what: format!("Reddit user u/{username}"),
        })?;

        Ok(RedditUserInfo {
            username: data.name,
            created_utc: data.created_utc,
            account_created: format_utc(data.created_utc, "%Y-%m-%d"),
            link_karma: data.link_karma,
            comment_karma: data.comment_karma,
            total_karma: data.total_karma,
            profile_url: format!("{}/user/{username}", self.base_url),
        })
    }

    /// Newest-first listing via the `after` cursor, 100 per page, capped at 200.
    async fn listing(&self, username: &str, kind: &str) -> Result<Vec<ThingData>, ExtractError> {
        let url = format!(
            "{}/user/{}/{kind}.json",
            self.base_url,
            encode_segment(username)
        );
        let collected = paginate(
            LISTING_CAP,
            self.http.settings().page_delay,
            None::<String>,
            |after| {
                let url = &url;
                async move {
                    let mut params = vec![
                        ("limit", LISTING_PAGE_SIZE.to_string()),
                        ("sort", "new".to_string()),
                    ];
                    if let Some(after) = after {
                        params.push(("after", after));
                    }
                    let listing: Listing = self
                        .http
                        .get_json(url, &params, &format!("Reddit {kind} of u/{username}"))
                        .await?;
                    let items = listing.data.children.into_iter().map(|t| t.data).collect();
                    Ok(Page::new(items, listing.data.after.filter(|a| !a.is_empty())))
                }
            },
        )
        .await;

        match collected.error {
            Some(e) if collected.items.is_empty() => Err(e),
            Some(e) => {
                self.reporter.warning(&format!(
                    "{kind}: stopped early after {} item(s): {e}",
                    collected.items.len()
                ));
                Ok(collected.items)
            }
            None => Ok(collected.items),
        }
    }

    fn permalink(&self, permalink: &str) -> String {
        format!("{}{permalink}", self.base_url)
    }

    async fn posts(&self, username: &str) -> Vec<RedditPost> {
        match self.listing(username, "submitted").await {
            Ok(things) => {
                let posts: Vec<RedditPost> = things
                    .into_iter()
                    .map(|t| RedditPost {
                        url: self.permalink(&t.permalink),
                        created: format_utc(t.created_utc, "%Y-%m-%d %H:%M:%S"),
                        title: t.title,
                        subreddit: t.subreddit,
                        score: t.score,
                        num_comments: t.num_comments,
                    })
                    .collect();
                self.reporter
                    .success(&format!("{} posts retrieved", posts.len()));
                posts
            }
            Err(e) => degrade(self.reporter.as_ref(), PlatformId::Reddit, "posts", &e),
        }
    }

    async fn comments(&self, username: &str) -> Vec<RedditComment> {
        match self.listing(username, "comments").await {
            Ok(things) => {
                let comments: Vec<RedditComment> = things
                    .into_iter()
                    .map(|t| RedditComment {
                        body: truncate_chars(&t.body, COMMENT_BODY_MAX_CHARS),
                        url: self.permalink(&t.permalink),
                        created: format_utc(t.created_utc, "%Y-%m-%d %H:%M:%S"),
                        subreddit: t.subreddit,
                        score: t.score,
                    })
                    .collect();
                self.reporter
                    .success(&format!("{} comments retrieved", comments.len()));
                comments
            }
            Err(e) => degrade(self.reporter.as_ref(), PlatformId::Reddit, "comments", &e),
        }
    }

    /// # Errors
    ///
    /// Fails when `about.json` fails or has no `data` ([`ExtractError::NotFound`]).
    pub async fn fetch_document(&self, username: &str) -> Result<RedditDocument, ExtractError> {
        let username = clean_handle(username);
        let username = username.strip_prefix("u/").unwrap_or(username);
        self.reporter
            .header(&format!("{} REDDIT EXTRACTOR", PlatformId::Reddit.icon()));
        self.reporter.step(&format!("Target: u/{username}"));

        let user_info = self.user_info(username).await?;
        self.reporter.success(&format!(
            "Profile retrieved: created {}, {} total karma ({} post, {} comment)",
            user_info.account_created,
            user_info.total_karma,
            user_info.link_karma,
            user_info.comment_karma
        ));

        let posts = self.posts(username).await;
        let comments = self.comments(username).await;

        Ok(RedditDocument {
            user_info,
            posts,
            comments,
            extraction_date: extraction_timestamp(),
        })
    }
}

#[async_trait]
impl PlatformClient for RedditClient {
    fn platform(&self) -> PlatformId {
        PlatformId::Reddit
    }

    async fn extract(&self, identity: &str) -> Result<serde_json::Value, ExtractError> {
        let document = self.fetch_document(identity).await?;
        Ok(serde_json::to_value(document)?)
    }
}
