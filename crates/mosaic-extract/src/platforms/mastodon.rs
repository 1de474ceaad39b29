//! Mastodon REST API against a single configurable instance.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use mosaic_core::credentials::DEFAULT_MASTODON_INSTANCE;
use mosaic_core::PlatformId;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::{clean_handle, PlatformClient};
use crate::error::ExtractError;
use crate::http::{encode_segment, HttpClient};
use crate::pagination::{next_link_url, paginate, Page};
use crate::persist::extraction_timestamp;
use crate::reporter::Reporter;

const STATUS_PAGE_SIZE: &str = "40";
const STATUS_CAP: usize = 200;

static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<.*?>").expect("valid regex"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid regex")
});

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiAccount {
    id: String,
    username: String,
    display_name: String,
    url: String,
    followers_count: u64,
    following_count: u64,
    statuses_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiStatus {
    id: String,
    created_at: Option<String>,
    content: String,
    url: Option<String>,
    replies_count: u64,
    reblogs_count: u64,
    favourites_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MastodonAccount {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub url: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub statuses_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MastodonStatus {
    pub id: String,
    pub created_at: Option<String>,
    /// Plain text: line breaks kept, tags stripped, entities decoded.
    pub content: String,
    pub url: Option<String>,
    pub replies_count: u64,
    pub reblogs_count: u64,
    pub favourites_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MastodonDocument {
    pub account: MastodonAccount,
    pub statuses: Vec<MastodonStatus>,
    pub extraction_date: String,
}

/// Turn status HTML into plain text.
#[must_use]
pub fn clean_html(html: &str) -> String {
    let text = BR_RE.replace_all(html, "\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = ENTITY_RE.replace_all(&text, |caps: &Captures<'_>| {
        decode_entity(&caps[0]).unwrap_or_else(|| caps[0].to_string())
    });
    text.trim().to_string()
}

/// Resolves one `&...;` reference against the HTML5 entity table.
fn decode_entity(reference: &str) -> Option<String> {
    quick_xml::escape::unescape_with(reference, quick_xml::escape::resolve_html5_entity)
        .ok()
        .map(std::borrow::Cow::into_owned)
}

pub struct MastodonClient {
    http: HttpClient,
    reporter: Arc<dyn Reporter>,
    instance: String,
    base_url: String,
}

impl MastodonClient {
    /// `instance` is a hostname (`infosec.exchange`) or a full base URL.
    #[must_use]
    pub fn new(http: HttpClient, reporter: Arc<dyn Reporter>, instance: &str) -> Self {
        let instance = match instance.trim().trim_end_matches('/') {
            "" => DEFAULT_MASTODON_INSTANCE,
            trimmed => trimmed,
        };
        let base_url = if instance.starts_with("http://") || instance.starts_with("https://") {
            instance.to_string()
        } else {
            format!("https://{instance}")
        };
        Self {
            http,
            reporter,
            instance: instance.to_string(),
            base_url,
        }
    }

    async fn lookup(&self, username: &str) -> Result<MastodonAccount, ExtractError> {
        let account: ApiAccount = self
            .http
            .get_json(
                &format!("{}/api/v1/accounts/lookup", self.base_url),
                &[("acct", username.to_string())],
                &format!("Mastodon account @{username}@{}", self.instance),
            )
            .await?;
        if account.id.is_empty() {
            return Err(ExtractError::NotFound {
                what: format!("Mastodon account @{username}@{}", self.instance),
            });
        }
        Ok(MastodonAccount {
            id: account.id,
            username: account.username,
            display_name: account.display_name,
            url: account.url,
            followers_count: account.followers_count,
            following_count: account.following_count,
            statuses_count: account.statuses_count,
        })
    }

    /// Follows `Link: <…>; rel="next"` from the first page, 40 per page, capped at 200.
    async fn statuses(&self, account_id: &str) -> Vec<MastodonStatus> {
        self.reporter
            .info(&format!("Fetching up to {STATUS_CAP} toots..."));
        let first_url = format!(
            "{}/api/v1/accounts/{}/statuses",
            self.base_url,
            encode_segment(account_id)
        );
        let fetched = std::sync::atomic::AtomicUsize::new(0);

        let collected = paginate(
            STATUS_CAP,
            self.http.settings().page_delay,
            None::<String>,
            |next_url| {
                let first_url = &first_url;
                let fetched = &fetched;
                async move {
                    let (url, query) = match next_url {
                        Some(url) => (url, Vec::new()),
                        None => (first_url.clone(), vec![("limit", STATUS_PAGE_SIZE.to_string())]),
                    };
                    let (statuses, link): (Vec<ApiStatus>, Option<String>) = self
                        .http
                        .get_json_with_link(&url, &query, &format!("Mastodon statuses of {account_id}"))
                        .await?;
                    let statuses: Vec<MastodonStatus> = statuses
                        .into_iter()
                        .map(|s| MastodonStatus {
                            content: clean_html(&s.content),
                            id: s.id,
                            created_at: s.created_at,
                            url: s.url,
                            replies_count: s.replies_count,
                            reblogs_count: s.reblogs_count,
                            favourites_count: s.favourites_count,
                        })
                        .collect();
                    let so_far = fetched.fetch_add(statuses.len(), std::sync::atomic::Ordering::Relaxed)
                        + statuses.len();
                    self.reporter
                        .progress(&format!("{}/{STATUS_CAP} toots", so_far.min(STATUS_CAP)));
                    Ok(Page::new(statuses, next_link_url(link.as_deref())))
                }
            },
        )
        .await;

        if let Some(e) = &collected.error {
            self.reporter.warning(&format!(
                "Toot retrieval stopped early after {} toot(s): {e}",
                collected.items.len()
            ));
        }
        self.reporter
            .success(&format!("{} toots retrieved", collected.items.len()));
        collected.items
    }

    /// # Errors
    ///
    /// Fails when the account lookup fails.
    pub async fn fetch_document(&self, username: &str) -> Result<MastodonDocument, ExtractError> {
        let username = clean_handle(username);
        self.reporter
            .header(&format!("{} MASTODON EXTRACTOR", PlatformId::Mastodon.icon()));
        self.reporter.info(&format!("Instance: {}", self.instance));
        self.reporter
            .step(&format!("Target: @{username}@{}", self.instance));

        let account = self.lookup(username).await?;
        self.reporter.success(&format!(
            "Account found: {} toots, {} followers, {} following",
            account.statuses_count, account.followers_count, account.following_count
        ));
        let statuses = self.statuses(&account.id).await;

        Ok(MastodonDocument {
            account,
            statuses,
            extraction_date: extraction_timestamp(),
        })
    }
}

#[async_trait]
impl PlatformClient for MastodonClient {
    fn platform(&self) -> PlatformId {
        PlatformId::Mastodon
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
    fn clean_html_keeps_line_breaks_and_strips_tags() {
        let html = r#"<p>Hello<br>world<br />again<BR/>!</p><p><a href="https://x.test">link</a></p>"#;
        assert_eq!(clean_html(html), "Hello\nworld\nagain\n!link");
    }

    #[test]
    fn clean_html_decodes_entities() {
        assert_eq!(
            clean_html("<p>R&amp;D &lt;3 &quot;rust&quot; &#39;ok&#39; &#x1F980;</p>"),
            "R&D <3 \"rust\" 'ok' 🦀"
        );
        assert_eq!(clean_html("&unknown; stays"), "&unknown; stays");
    }

    #[test]
    fn clean_html_decodes_html5_named_entities() {
        assert_eq!(
            clean_html("<p>caf&eacute; &rsquo;quoted&rsquo; &euro;5</p>"),
            "café ’quoted’ €5"
        );
        assert_eq!(clean_html("&Eacute;t&eacute;&nbsp;&hellip;"), "Été\u{a0}…");
    }

    #[test]
    fn instance_may_be_hostname_or_url() {
        let http = HttpClient::new(crate::http::ClientSettings::default()).unwrap();
        let reporter: Arc<dyn Reporter> = Arc::new(crate::reporter::RecordingReporter::new());
        let by_host = MastodonClient::new(http.clone(), Arc::clone(&reporter), "infosec.exchange");
        assert_eq!(by_host.base_url, "https://infosec.exchange");
        let by_url = MastodonClient::new(http.clone(), Arc::clone(&reporter), "http://127.0.0.1:8080/");
        assert_eq!(by_url.base_url, "http://127.0.0.1:8080");
        let blank = MastodonClient::new(http, reporter, "  ");
        assert_eq!(blank.base_url, "https://infosec.exchange");
    }
}
