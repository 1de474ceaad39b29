//! Medium author RSS feed (`https://medium.com/feed/@{handle}`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mosaic_core::PlatformId;
use serde::Serialize;

use super::{clean_handle, PlatformClient};
use crate::error::ExtractError;
use crate::http::{encode_segment, HttpClient};
use crate::persist::extraction_timestamp;
use crate::reporter::Reporter;

const DEFAULT_BASE_URL: &str = "https://medium.com";
const FEED_TIMEOUT: Duration = Duration::from_secs(10);
const PREVIEW_COUNT: usize = 5;
const PREVIEW_TITLE_MAX_CHARS: usize = 60;

#[derive(Debug, Clone, Serialize)]
pub struct MediumArticle {
    pub title: String,
    pub url: String,
    /// RFC 2822 publication date as carried by the feed, when present.
    pub date: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediumDocument {
    pub articles: Vec<MediumArticle>,
    pub extraction_date: String,
}

/// Parse an RSS/Atom body into articles.
///
/// # Errors
///
/// Returns [`ExtractError::Feed`] on malformed XML.
pub fn parse_feed(body: &str) -> Result<Vec<MediumArticle>, ExtractError> {
    let feed = feed_rs::parser::parse(body.as_bytes())?;
    let articles = feed
        .entries
        .into_iter()
        .map(|entry| MediumArticle {
            title: entry
                .title
                .map_or_else(|| "N/A".to_string(), |t| t.content),
            url: entry
                .links
                .into_iter()
                .next()
                .map_or_else(|| "N/A".to_string(), |l| l.href),
            date: entry.published.or(entry.updated).map(|d| d.to_rfc2822()),
            tags: entry.categories.into_iter().map(|c| c.term).collect(),
        })
        .collect();
    Ok(articles)
}

pub struct MediumClient {
    http: HttpClient,
    reporter: Arc<dyn Reporter>,
    base_url: String,
}

impl MediumClient {
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

    /// # Errors
    ///
    /// Fetch failures, malformed XML and an empty feed are all fatal.
    pub async fn fetch_document(&self, handle: &str) -> Result<MediumDocument, ExtractError> {
        let handle = clean_handle(handle);
        self.reporter
            .header(&format!("{} MEDIUM EXTRACTOR", PlatformId::Medium.icon()));
        self.reporter.step(&format!("Target: @{handle}"));

        let feed_url = format!("{}/feed/@{}", self.base_url, encode_segment(handle));
        self.reporter.progress(&format!("RSS URL: {feed_url}"));

        let body = self
            .http
            .get_text(&feed_url, FEED_TIMEOUT, &format!("Medium feed for @{handle}"))
            .await?;
        let articles = parse_feed(&body)?;
        if articles.is_empty() {
            return Err(ExtractError::NotFound {
                what: format!("Medium articles for @{handle}"),
            });
        }

        self.reporter
            .success(&format!("{} article(s) found", articles.len()));
        for article in articles.iter().take(PREVIEW_COUNT) {
            let title = if article.title.chars().count() > PREVIEW_TITLE_MAX_CHARS {
                let head: String = article.title.chars().take(PREVIEW_TITLE_MAX_CHARS - 3).collect();
                format!("{head}...")
            } else {
                article.title.clone()
            };
            self.reporter.progress(&format!("• {title}"));
        }
        if articles.len() > PREVIEW_COUNT {
            self.reporter
                .progress(&format!("... and {} more", articles.len() - PREVIEW_COUNT));
        }

        Ok(MediumDocument {
            articles,
            extraction_date: extraction_timestamp(),
        })
    }
}

#[async_trait]
impl PlatformClient for MediumClient {
    fn platform(&self) -> PlatformId {
        PlatformId::Medium
    }

    async fn extract(&self, identity: &str) -> Result<serde_json::Value, ExtractError> {
        let document = self.fetch_document(identity).await?;
        Ok(serde_json::to_value(document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Stories by Jane on Medium</title>
    <link>https://medium.com/@jane</link>
    <description>Stories</description>
    <item>
      <title><![CDATA[Ownership in practice]]></title>
      <link>https://medium.com/@jane/ownership-1</link>
      <category><![CDATA[rust]]></category>
      <category><![CDATA[programming]]></category>
      <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Second</title>
      <link>https://medium.com/@jane/second-2</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_with_tags_and_dates() {
        let articles = parse_feed(SAMPLE_RSS).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Ownership in practice");
        assert_eq!(articles[0].url, "https://medium.com/@jane/ownership-1");
        assert_eq!(articles[0].tags, vec!["rust", "programming"]);
        assert!(articles[0].date.as_deref().unwrap().contains("Jan 2024"));
        assert!(articles[1].tags.is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(matches!(
            parse_feed("this is not xml"),
            Err(ExtractError::Feed(_))
        ));
    }
}
