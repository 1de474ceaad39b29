//! GitHub REST v3: profile, recently updated repositories, public events.

use std::sync::Arc;

use async_trait::async_trait;
use mosaic_core::PlatformId;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use super::{degrade, PlatformClient};
use crate::error::ExtractError;
use crate::http::{encode_segment, HttpClient};
use crate::persist::extraction_timestamp;
use crate::reporter::Reporter;

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const PER_PAGE: &str = "100";

// --- API response types (private) -----------------------------------------

#[derive(Debug, Deserialize)]
struct ApiUser {
    #[serde(default)]
    login: String,
    name: Option<String>,
    bio: Option<String>,
    company: Option<String>,
    location: Option<String>,
    email: Option<String>,
    blog: Option<String>,
    twitter_username: Option<String>,
    #[serde(default)]
    public_repos: u64,
    #[serde(default)]
    public_gists: u64,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    following: u64,
    created_at: Option<String>,
    updated_at: Option<String>,
    #[serde(default)]
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepo {
    #[serde(default)]
    name: String,
    description: Option<String>,
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    watchers_count: u64,
    created_at: Option<String>,
    updated_at: Option<String>,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    #[serde(default, rename = "type")]
    kind: String,
    repo: Option<ApiEventRepo>,
    created_at: Option<String>,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiEventRepo {
    #[serde(default)]
    name: String,
}

// --- Normalized document ---------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GithubUserInfo {
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub blog: Option<String>,
    pub twitter: Option<String>,
    pub public_repos: u64,
    pub public_gists: u64,
    pub followers: u64,
    pub following: u64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub profile_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GithubRepository {
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub url: String,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GithubEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub repo: String,
    pub created_at: Option<String>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct GithubDocument {
    pub user_info: GithubUserInfo,
    pub repositories: Vec<GithubRepository>,
    pub events: Vec<GithubEvent>,
    pub extraction_date: String,
}

impl From<ApiUser> for GithubUserInfo {
    fn from(user: ApiUser) -> Self {
        Self {
            username: user.login,
            name: user.name,
            bio: user.bio,
            company: user.company,
            location: user.location,
            email: user.email,
            blog: user.blog,
            twitter: user.twitter_username,
            public_repos: user.public_repos,
            public_gists: user.public_gists,
            followers: user.followers,
            following: user.following,
            created_at: user.created_at,
            updated_at: user.updated_at,
            profile_url: user.html_url,
        }
    }
}

impl From<ApiRepo> for GithubRepository {
    fn from(repo: ApiRepo) -> Self {
        Self {
            name: repo.name,
            description: repo.description,
            language: repo.language,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            watchers: repo.watchers_count,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            url: repo.html_url,
            topics: repo.topics,
        }
    }
}

impl From<ApiEvent> for GithubEvent {
    fn from(event: ApiEvent) -> Self {
        Self {
            kind: event.kind,
            repo: event.repo.map(|r| r.name).unwrap_or_default(),
            created_at: event.created_at,
            payload: event.payload,
        }
    }
}

// --- Client ----------------------------------------------------------------

pub struct GithubClient {
    http: HttpClient,
    reporter: Arc<dyn Reporter>,
    token: Option<String>,
    base_url: String,
}

impl GithubClient {
    #[must_use]
    pub fn new(http: HttpClient, reporter: Arc<dyn Reporter>, token: Option<String>) -> Self {
        Self::with_base_url(http, reporter, token, DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(
        http: HttpClient,
        reporter: Arc<dyn Reporter>,
        token: Option<String>,
        base_url: &str,
    ) -> Self {
        Self {
            http,
            reporter,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));
        if let Some(token) = &self.token {
            match HeaderValue::from_str(&format!("token {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("GitHub token contains invalid header characters; sending unauthenticated"),
            }
        }
        headers
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T, ExtractError> {
        let url = format!("{}{path}", self.base_url);
        let (parsed, _) = self
            .http
            .get_json_with_headers(&url, query, self.headers(), context)
            .await?;
        Ok(parsed)
    }

    /// Profile first (fatal on failure), then repositories and events (degraded).
    ///
    /// # Errors
    ///
    /// Returns the profile request's error; 404 maps to [`ExtractError::NotFound`].
    pub async fn fetch_document(&self, username: &str) -> Result<GithubDocument, ExtractError> {
        let username = username.trim();
        let segment = encode_segment(username);

        self.reporter.header(&format!("{} GITHUB EXTRACTOR", PlatformId::Github.icon()));
        self.reporter.step(&format!("Target: {username}"));

        let user: ApiUser = self
            .get(
                &format!("/users/{segment}"),
                &[],
                &format!("GitHub user {username}"),
            )
            .await?;
        let user_info = GithubUserInfo::from(user);
        self.reporter.success(&format!(
            "Profile retrieved: {} repos, {} followers, {} following",
            user_info.public_repos, user_info.followers, user_info.following
        ));

        let repositories = match self
            .get::<Vec<ApiRepo>>(
                &format!("/users/{segment}/repos"),
                &[("per_page", PER_PAGE.to_string()), ("sort", "updated".to_string())],
                &format!("GitHub repositories of {username}"),
            )
            .await
        {
            Ok(repos) => {
                self.reporter
                    .success(&format!("{} repository(ies) retrieved", repos.len()));
                repos.into_iter().map(GithubRepository::from).collect()
            }
            Err(e) => degrade(self.reporter.as_ref(), PlatformId::Github, "repositories", &e),
        };

        let events = match self
            .get::<Vec<ApiEvent>>(
                &format!("/users/{segment}/events/public"),
                &[("per_page", PER_PAGE.to_string())],
                &format!("GitHub events of {username}"),
            )
            .await
        {
            Ok(events) => {
                self.reporter
                    .success(&format!("{} event(s) retrieved", events.len()));
                events.into_iter().map(GithubEvent::from).collect()
            }
            Err(e) => degrade(self.reporter.as_ref(), PlatformId::Github, "events", &e),
        };

        Ok(GithubDocument {
            user_info,
            repositories,
            events,
            extraction_date: extraction_timestamp(),
        })
    }
}

#[async_trait]
impl PlatformClient for GithubClient {
    fn platform(&self) -> PlatformId {
        PlatformId::Github
    }

    async fn extract(&self, identity: &str) -> Result<serde_json::Value, ExtractError> {
        let document = self.fetch_document(identity).await?;
        Ok(serde_json::to_value(document)?)
    }
}
