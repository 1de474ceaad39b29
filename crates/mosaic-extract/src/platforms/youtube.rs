//! YouTube Data API v3: channel search, channel statistics, latest uploads.

use std::sync::Arc;

use async_trait::async_trait;
use mosaic_core::PlatformId;
use serde::{Deserialize, Serialize};

use super::{degrade, PlatformClient};
use crate::error::ExtractError;
use crate::http::HttpClient;
use crate::pagination::{paginate, Page};
use crate::persist::extraction_timestamp;
use crate::reporter::Reporter;
use crate::selection::CandidatePicker;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const SEARCH_MAX_RESULTS: &str = "10";
const VIDEO_PAGE_SIZE: &str = "50";
const VIDEO_CAP: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    channel_id: Option<String>,
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    channel_id: Option<String>,
    title: String,
    description: String,
    published_at: Option<String>,
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnails {
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiChannel {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

/// The API returns counts as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Statistics {
    subscriber_count: Option<String>,
    video_count: Option<String>,
    view_count: Option<String>,
}

fn count(raw: Option<&String>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

#[derive(Debug, Clone, Serialize)]
pub struct YoutubeChannelInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<String>,
    pub thumbnail: Option<String>,
    pub subscribers: u64,
    pub video_count: u64,
    pub view_count: u64,
    pub url: String,
}

impl From<ApiChannel> for YoutubeChannelInfo {
    fn from(channel: ApiChannel) -> Self {
        let url = format!("https://www.youtube.com/channel/{}", channel.id);
        Self {
            subscribers: count(channel.statistics.subscriber_count.as_ref()),
            video_count: count(channel.statistics.video_count.as_ref()),
            view_count: count(channel.statistics.view_count.as_ref()),
            id: channel.id,
            title: channel.snippet.title,
            description: channel.snippet.description,
            published_at: channel.snippet.published_at,
            thumbnail: channel.snippet.thumbnails.high.map(|t| t.url),
            url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct YoutubeVideo {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<String>,
    pub thumbnail: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct YoutubeChannel {
    pub channel_info: YoutubeChannelInfo,
    pub videos: Vec<YoutubeVideo>,
    pub extraction_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct YoutubeDocument {
    pub channels: Vec<YoutubeChannel>,
    pub total_channels: usize,
    pub extraction_date: String,
}

pub struct YoutubeClient {
    http: HttpClient,
    reporter: Arc<dyn Reporter>,
    picker: Arc<dyn CandidatePicker>,
    api_key: String,
    base_url: String,
}

impl YoutubeClient {
    /// The API key is mandatory; the resolver refuses to build this client without one.
    #[must_use]
    pub fn new(
        http: HttpClient,
        reporter: Arc<dyn Reporter>,
        picker: Arc<dyn CandidatePicker>,
        api_key: String,
    ) -> Self {
        Self::with_base_url(http, reporter, picker, api_key, DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(
        http: HttpClient,
        reporter: Arc<dyn Reporter>,
        picker: Arc<dyn CandidatePicker>,
        api_key: String,
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

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<ListResponse<T>, ExtractError> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("key", self.api_key.clone()));
        let url = format!("{}/{endpoint}", self.base_url);
        self.http.get_json(&url, &query, context).await
    }

    async fn channels_by_id(&self, ids: &[String]) -> Result<Vec<ApiChannel>, ExtractError> {
        let response: ListResponse<ApiChannel> = self
            .get(
                "channels",
                &[
                    ("part", "snippet,statistics".to_string()),
                    ("id", ids.join(",")),
                ],
                "YouTube channel details",
            )
            .await?;
        Ok(response.items)
    }

    /// Channel search enriched with statistics, in search ranking order.
    async fn search_channels(&self, query: &str) -> Result<Vec<ApiChannel>, ExtractError> {
        let search: ListResponse<SearchItem> = self
            .get(
                "search",
                &[
                    ("part", "snippet".to_string()),
                    ("q", query.to_string()),
                    ("type", "channel".to_string()),
                    ("maxResults", SEARCH_MAX_RESULTS.to_string()),
                ],
                &format!("YouTube channel search for {query}"),
            )
            .await?;

        let ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.channel_id.or(item.snippet.channel_id))
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut channels = self.channels_by_id(&ids).await?;
        channels.sort_by_key(|c| ids.iter().position(|id| *id == c.id).unwrap_or(usize::MAX));
        Ok(channels)
    }

    async fn channel_info(&self, channel_id: &str) -> Result<YoutubeChannelInfo, ExtractError> {
        self.channels_by_id(&[channel_id.to_string()])
            .await?
            .into_iter()
            .next()
            .map(YoutubeChannelInfo::from)
            .ok_or_else(|| ExtractError::NotFound {
                what: format!("YouTube channel {channel_id}"),
            })
    }

    /// Newest uploads via `pageToken`, 50 per page, capped at 100.
    async fn videos(&self, channel_id: &str) -> Vec<YoutubeVideo> {
        let collected = paginate(
            VIDEO_CAP,
            self.http.settings().page_delay,
            None::<String>,
            |token| async move {
                let mut params = vec![
                    ("part", "snippet".to_string()),
                    ("channelId", channel_id.to_string()),
                    ("type", "video".to_string()),
                    ("order", "date".to_string()),
                    ("maxResults", VIDEO_PAGE_SIZE.to_string()),
                ];
                if let Some(token) = token {
                    params.push(("pageToken", token));
                }
                let response: ListResponse<SearchItem> = self
                    .get("search", &params, &format!("YouTube videos of {channel_id}"))
                    .await?;
                let videos = response
                    .items
                    .into_iter()
                    .filter_map(|item| {
                        let video_id = item.id.video_id?;
                        Some(YoutubeVideo {
                            url: format!("https://www.youtube.com/watch?v={video_id}"),
                            video_id,
                            title: item.snippet.title,
                            description: item.snippet.description,
                            published_at: item.snippet.published_at,
                            thumbnail: item.snippet.thumbnails.high.map(|t| t.url),
                        })
                    })
                    .collect();
                Ok(Page::new(videos, response.next_page_token))
            },
        )
        .await;

        match collected.error {
            Some(e) if collected.items.is_empty() => {
                degrade(self.reporter.as_ref(), PlatformId::Youtube, "videos", &e)
            }
            Some(e) => {
                self.reporter.warning(&format!(
                    "videos: stopped early after {} item(s): {e}",
                    collected.items.len()
                ));
                collected.items
            }
            None => {
                self.reporter
                    .success(&format!("{} video(s) retrieved", collected.items.len()));
                collected.items
            }
        }
    }

    async fn extract_channel(&self, channel_id: &str) -> Result<YoutubeChannel, ExtractError> {
        let channel_info = self.channel_info(channel_id).await?;
        self.reporter.success(&format!(
            "Channel retrieved: {} ({} subscribers, {} videos, {} views)",
            channel_info.title,
            channel_info.subscribers,
            channel_info.video_count,
            channel_info.view_count
        ));
        let videos = self.videos(channel_id).await;
        Ok(YoutubeChannel {
            channel_info,
            videos,
            extraction_date: extraction_timestamp(),
        })
    }

    /// Search channels, let the picker choose, then extract every chosen channel.
    ///
    /// # Errors
    ///
    /// Fails when the search fails or finds nothing, or when every chosen
    /// channel's details fail.
    pub async fn fetch_document(&self, query: &str) -> Result<YoutubeDocument, ExtractError> {
        let query = query.trim();
        self.reporter
            .header(&format!("{} YOUTUBE EXTRACTOR", PlatformId::Youtube.icon()));
        self.reporter.step(&format!("Searching for: {query}"));

        let candidates = self.search_channels(query).await?;
        if candidates.is_empty() {
            return Err(ExtractError::NotFound {
                what: format!("YouTube channel matching \"{query}\""),
            });
        }
        self.reporter
            .success(&format!("Found {} channel(s)", candidates.len()));

        let labels: Vec<String> = candidates
            .iter()
            .map(|c| {
                format!(
                    "{} - {} subscribers, {} videos",
                    c.snippet.title,
                    count(c.statistics.subscriber_count.as_ref()),
                    count(c.statistics.video_count.as_ref())
                )
            })
            .collect();
        let selection = self.picker.pick("Channels found", &labels).await;
        if selection.fell_back {
            self.reporter.warning("Invalid selection, using first channel");
        }
        let chosen: Vec<&ApiChannel> = selection
            .indices
            .iter()
            .filter_map(|&i| candidates.get(i))
            .collect();

        let mut channels = Vec::new();
        for (position, candidate) in chosen.iter().enumerate() {
            if chosen.len() > 1 {
                self.reporter.step(&format!(
                    "Extracting channel {}/{}: {}",
                    position + 1,
                    chosen.len(),
                    candidate.snippet.title
                ));
            }
            match self.extract_channel(&candidate.id).await {
                Ok(channel) => channels.push(channel),
                Err(e) => {
                    tracing::warn!(platform = "youtube", channel_id = %candidate.id, error = %e, "channel extraction failed");
                    self.reporter
                        .failure(&format!("Channel {} skipped: {e}", candidate.id));
                }
            }

            let cooldown = self.http.settings().identity_cooldown;
            if position + 1 < chosen.len() && !cooldown.is_zero() {
                tokio::time::sleep(cooldown).await;
            }
        }

        if channels.is_empty() {
            return Err(ExtractError::NotFound {
                what: "data for any selected YouTube channel".to_string(),
            });
        }

        Ok(YoutubeDocument {
            total_channels: channels.len(),
            channels,
            extraction_date: extraction_timestamp(),
        })
    }
}

#[async_trait]
impl PlatformClient for YoutubeClient {
    fn platform(&self) -> PlatformId {
        PlatformId::Youtube
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
    fn channel_counts_parse_from_strings() {
        let channel: ApiChannel = serde_json::from_value(serde_json::json!({
            "id": "UC123",
            "snippet": {
                "title": "Rust Talks",
                "description": "talks",
                "publishedAt": "2015-05-15T00:00:00Z",
                "thumbnails": {"high": {"url": "https://img.test/high.jpg"}}
            },
            "statistics": {"subscriberCount": "1200", "videoCount": "42", "viewCount": "not-a-number"}
        }))
        .unwrap();
        let info = YoutubeChannelInfo::from(channel);
        assert_eq!(info.subscribers, 1200);
        assert_eq!(info.video_count, 42);
        assert_eq!(info.view_count, 0);
        assert_eq!(info.thumbnail.as_deref(), Some("https://img.test/high.jpg"));
        assert_eq!(info.url, "https://www.youtube.com/channel/UC123");
    }
}
