//! Stack Exchange API 2.3 against `site=stackoverflow`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use mosaic_core::PlatformId;
use serde::{Deserialize, Serialize};

use super::{degrade, PlatformClient};
use crate::error::ExtractError;
use crate::http::HttpClient;
use crate::pagination::{paginate, Page};
use crate::persist::extraction_timestamp;
use crate::reporter::Reporter;
use crate::selection::CandidatePicker;

const DEFAULT_BASE_URL: &str = "https://api.stackexchange.com/2.3";
const SITE: &str = "stackoverflow";
const SEARCH_PAGE_SIZE: &str = "10";
const PAGE_SIZE: u32 = 100;
const COLLECTION_CAP: usize = 200;

#[derive(Debug, Deserialize)]
struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiUser {
    user_id: u64,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    reputation: u64,
    #[serde(default)]
    badge_counts: BTreeMap<String, u64>,
    creation_date: Option<i64>,
    location: Option<String>,
    website_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StackOverflowUserInfo {
    pub user_id: u64,
    pub display_name: String,
    pub link: String,
    pub reputation: u64,
    pub badge_counts: BTreeMap<String, u64>,
    /// `YYYY-MM-DD`.
    pub creation_date: Option<String>,
    pub location: Option<String>,
    pub website_url: Option<String>,
}

impl From<ApiUser> for StackOverflowUserInfo {
    fn from(user: ApiUser) -> Self {
        Self {
            user_id: user.user_id,
            display_name: user.display_name,
            link: user.link,
            reputation: user.reputation,
            badge_counts: user.badge_counts,
            creation_date: user
                .creation_date
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.format("%Y-%m-%d").to_string()),
            location: user.location,
            website_url: user.website_url,
        }
    }
}

/// Questions, answers and badges are kept exactly as the API returns them.
#[derive(Debug, Clone, Serialize)]
pub struct StackOverflowUser {
    pub user_info: StackOverflowUserInfo,
    pub questions: Vec<serde_json::Value>,
    pub answers: Vec<serde_json::Value>,
    pub badges: Vec<serde_json::Value>,
    pub extraction_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StackOverflowDocument {
    pub users: Vec<StackOverflowUser>,
    pub total_users: usize,
    pub extraction_date: String,
}

pub struct StackOverflowClient {
    http: HttpClient,
    reporter: Arc<dyn Reporter>,
    picker: Arc<dyn CandidatePicker>,
    api_key: Option<String>,
    base_url: String,
}

impl StackOverflowClient {
    #[must_use]
    pub fn new(
        http: HttpClient,
        reporter: Arc<dyn Reporter>,
        picker: Arc<dyn CandidatePicker>,
        api_key: Option<String>,
    ) -> Self {
        Self::with_base_url(http, reporter, picker, api_key, DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(
        http: HttpClient,
        reporter: Arc<dyn Reporter>,
        picker: Arc<dyn CandidatePicker>,
        api_key: Option<String>,
        base_url: &str,
    ) -> Self {
        Self {
            http,
            reporter,
            picker,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Every request carries `site` and, when configured, `key`.
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<ItemsResponse<T>, ExtractError> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("site", SITE.to_string()));
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }
        let url = format!("{}/{path}", self.base_url);
        self.http.get_json(&url, &query, context).await
    }

    async fn search_users(&self, name: &str) -> Result<Vec<ApiUser>, ExtractError> {
        let response: ItemsResponse<ApiUser> = self
            .request(
                "users",
                &[
                    ("inname", name.to_string()),
                    ("pagesize", SEARCH_PAGE_SIZE.to_string()),
                    ("order", "desc".to_string()),
                    ("sort", "reputation".to_string()),
                ],
                &format!("Stack Overflow user search for {name}"),
            )
            .await?;
        Ok(response.items)
    }

    async fn profile(&self, user_id: u64) -> Result<StackOverflowUserInfo, ExtractError> {
        let response: ItemsResponse<ApiUser> = self
            .request(
                &format!("users/{user_id}"),
                &[("filter", "withbody".to_string())],
                &format!("Stack Overflow user {user_id}"),
            )
            .await?;
        response
            .items
            .into_iter()
            .next()
            .map(StackOverflowUserInfo::from)
            .ok_or_else(|| ExtractError::NotFound {
                what: format!("Stack Overflow user {user_id}"),
            })
    }

    /// Page-numbered collection (`page`, `has_more`), 100 per page, capped at 200.
    async fn collection(
        &self,
        user_id: u64,
        section: &str,
        sort: &str,
    ) -> Result<Vec<serde_json::Value>, ExtractError> {
        let path = format!("users/{user_id}/{section}");
        let context = format!("Stack Overflow {section} of {user_id}");
        let collected = paginate(
            COLLECTION_CAP,
            self.http.settings().page_delay,
            Some(1u32),
            |page| {
                let page = page.unwrap_or(1);
                let path = &path;
                let context = &context;
                async move {
                    let response: ItemsResponse<serde_json::Value> = self
                        .request(
                            path,
                            &[
                                ("page", page.to_string()),
                                ("pagesize", PAGE_SIZE.to_string()),
                                ("order", "desc".to_string()),
                                ("sort", sort.to_string()),
                            ],
                            context,
                        )
                        .await?;
                    let next = response.has_more.then_some(page + 1);
                    Ok(Page::new(response.items, next))
                }
            },
        )
        .await;

        match collected.error {
            // Nothing at all came back: report the section as unavailable.
            Some(e) if collected.items.is_empty() => Err(e),
            Some(e) => {
                self.reporter.warning(&format!(
                    "{section}: stopped early after {} item(s): {e}",
                    collected.items.len()
                ));
                Ok(collected.items)
            }
            None => Ok(collected.items),
        }
    }

    async fn section(&self, user_id: u64, section: &str, sort: &str) -> Vec<serde_json::Value> {
        match self.collection(user_id, section, sort).await {
            Ok(items) => {
                self.reporter
                    .success(&format!("{} {section} retrieved", items.len()));
                items
            }
            Err(e) => degrade(self.reporter.as_ref(), PlatformId::StackOverflow, section, &e),
        }
    }

    async fn extract_user(&self, user_id: u64) -> Result<StackOverflowUser, ExtractError> {
        let user_info = self.profile(user_id).await?;
        let gold = user_info.badge_counts.get("gold").copied().unwrap_or(0);
        let silver = user_info.badge_counts.get("silver").copied().unwrap_or(0);
        let bronze = user_info.badge_counts.get("bronze").copied().unwrap_or(0);
        self.reporter.success(&format!(
            "Profile retrieved: {} ({} reputation; {gold} gold, {silver} silver, {bronze} bronze)",
            user_info.display_name, user_info.reputation
        ));

        let questions = self.section(user_id, "questions", "votes").await;
        let answers = self.section(user_id, "answers", "votes").await;
        let badges = self.section(user_id, "badges", "rank").await;

        Ok(StackOverflowUser {
            user_info,
            questions,
            answers,
            badges,
            extraction_date: extraction_timestamp(),
        })
    }

    /// Search, let the picker choose, then extract every chosen user.
    ///
    /// # Errors
    ///
    /// Fails when the search fails or finds nobody, or when every chosen
    /// user's profile fails.
    pub async fn fetch_document(&self, name: &str) -> Result<StackOverflowDocument, ExtractError> {
        let name = name.trim();
        self.reporter.header(&format!(
            "{} STACK OVERFLOW EXTRACTOR",
            PlatformId::StackOverflow.icon()
        ));
        if self.api_key.is_some() {
            self.reporter.info("API key configured (rate limit: 10,000 requests/day)");
        } else {
            self.reporter.info("No API key (rate limit: 300 requests/day)");
        }

        self.reporter.step(&format!("Searching for: {name}"));
        let candidates = self.search_users(name).await?;
        if candidates.is_empty() {
            return Err(ExtractError::NotFound {
                what: format!("Stack Overflow user matching \"{name}\""),
            });
        }
        self.reporter
            .success(&format!("Found {} user(s)", candidates.len()));

        let labels: Vec<String> = candidates
            .iter()
            .map(|u| format!("{} - {} reputation", u.display_name, u.reputation))
            .collect();
        let selection = self.picker.pick("Users found", &labels).await;
        if selection.fell_back {
            self.reporter.warning("Invalid selection, using first user");
        }
        let chosen: Vec<&ApiUser> = selection
            .indices
            .iter()
            .filter_map(|&i| candidates.get(i))
            .collect();

        let mut users = Vec::new();
        for (position, candidate) in chosen.iter().enumerate() {
            if chosen.len() > 1 {
                self.reporter.step(&format!(
                    "Extracting user {}/{}: {}",
                    position + 1,
                    chosen.len(),
                    candidate.display_name
                ));
            }
            match self.extract_user(candidate.user_id).await {
                Ok(user) => users.push(user),
                Err(e) => {
                    tracing::warn!(platform = "stackoverflow", user_id = candidate.user_id, error = %e, "user extraction failed");
                    self.reporter
                        .failure(&format!("User {} skipped: {e}", candidate.user_id));
                }
            }

            let cooldown = self.http.settings().identity_cooldown;
            if position + 1 < chosen.len() && !cooldown.is_zero() {
                tokio::time::sleep(cooldown).await;
            }
        }

        if users.is_empty() {
            return Err(ExtractError::NotFound {
                what: "data for any selected Stack Overflow user".to_string(),
            });
        }

        Ok(StackOverflowDocument {
            total_users: users.len(),
            users,
            extraction_date: extraction_timestamp(),
        })
    }
}

#[async_trait]
impl PlatformClient for StackOverflowClient {
    fn platform(&self) -> PlatformId {
        PlatformId::StackOverflow
    }

    async fn extract(&self, identity: &str) -> Result<serde_json::Value, ExtractError> {
        let document = self.fetch_document(identity).await?;
        Ok(serde_json::to_value(document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_date_is_formatted_as_day() {
        let user: ApiUser = serde_json::from_value(serde_json::json!({
            "user_id": 22656,
            "display_name": "Jon Skeet",
            "reputation": 1_400_000,
            "creation_date": 1_222_430_705,
            "badge_counts": {"gold": 1, "silver": 2, "bronze": 3}
        }))
        .unwrap();
        let info = StackOverflowUserInfo::from(user);
        assert_eq!(info.creation_date.as_deref(), Some("2008-09-26"));
        assert_eq!(info.badge_counts.get("silver"), Some(&2));
        assert!(info.location.is_none());
    }
}
