//! Shared HTTP client injected into every platform client.

use std::time::Duration;

use mosaic_core::AppConfig;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::ExtractError;

/// Unreserved characters (RFC 3986) stay as-is inside a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Timing and identification knobs shared by all platform clients.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub user_agent: String,
    /// Politeness delay between consecutive page requests.
    pub page_delay: Duration,
    /// Pause between sub-extractions of a multi-select platform.
    pub identity_cooldown: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: mosaic_core::config::DEFAULT_USER_AGENT.to_string(),
            page_delay: Duration::from_millis(500),
            identity_cooldown: Duration::from_secs(1),
        }
    }
}

impl ClientSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout_secs),
            user_agent: config.user_agent.clone(),
            page_delay: config.page_delay(),
            identity_cooldown: config.identity_cooldown(),
        }
    }

    /// Settings with every delay zeroed, for mock-server tests.
    #[must_use]
    pub fn without_delays() -> Self {
        Self {
            page_delay: Duration::ZERO,
            identity_cooldown: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Thin wrapper over `reqwest::Client` mapping non-2xx statuses and
/// malformed bodies to typed [`ExtractError`]s.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    settings: ClientSettings,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(settings: ClientSettings) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&settings.user_agent)
            .build()?;
        Ok(Self { client, settings })
    }

    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// GET a JSON document.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::NotFound`]: HTTP 404.
    /// - [`ExtractError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`ExtractError::Http`]: network, timeout or TLS failure.
    /// - [`ExtractError::Deserialize`]: body is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T, ExtractError> {
        let (parsed, _) = self
            .get_json_with_headers(url, query, HeaderMap::new(), context)
            .await?;
        Ok(parsed)
    }

    /// GET a JSON document and also return the raw `Link` response header.
    ///
    /// # Errors
    ///
    /// See [`Self::get_json`].
    pub async fn get_json_with_link<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<(T, Option<String>), ExtractError> {
        self.get_json_with_headers(url, query, HeaderMap::new(), context)
            .await
    }

    /// GET a JSON document with extra request headers.
    ///
    /// # Errors
    ///
    /// See [`Self::get_json`].
    pub async fn get_json_with_headers<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: HeaderMap,
        context: &str,
    ) -> Result<(T, Option<String>), ExtractError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json")
            .headers(headers)
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ExtractError::NotFound {
                what: context.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ExtractError::UnexpectedStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        // Extract the Link header before consuming the response body.
        let link_header = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = response.text().await?;
        let parsed = serde_json::from_str::<T>(&body).map_err(|e| ExtractError::Deserialize {
            context: context.to_string(),
            source: e,
        })?;

        Ok((parsed, link_header))
    }

    /// GET a text body with a per-request timeout override.
    ///
    /// # Errors
    ///
    /// Same status mapping as [`Self::get_json`].
    pub async fn get_text(
        &self,
        url: &str,
        timeout: Duration,
        context: &str,
    ) -> Result<String, ExtractError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ExtractError::NotFound {
                what: context.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ExtractError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Percent-encode a user-supplied value for use as one URL path segment.
#[must_use]
pub fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_segment_keeps_unreserved_characters() {
        assert_eq!(encode_segment("octo-cat_1.2~x"), "octo-cat_1.2~x");
    }

    #[test]
    fn encode_segment_escapes_separators() {
        assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
        assert_eq!(encode_segment("../etc"), "..%2Fetc");
    }

    #[test]
    fn without_delays_zeroes_waits_only() {
        let settings = ClientSettings::without_delays();
        assert_eq!(settings.page_delay, Duration::ZERO);
        assert_eq!(settings.identity_cooldown, Duration::ZERO);
        assert_eq!(settings.timeout, Duration::from_secs(15));
    }
}
