//! Capped, delay-paced pagination shared by every paginated collection.
//!
//! Each platform reports "more pages" differently (numeric page + `has_more`,
//! opaque cursor tokens, `Link` headers). Clients translate their response
//! into a [`Page`] and let [`paginate`] own the stop conditions.
//!
//! ## `Link` header format
//!
//! ```text
//! <https://mastodon.social/api/v1/accounts/1/statuses?max_id=9>; rel="next",
//! <https://mastodon.social/api/v1/accounts/1/statuses?min_id=20>; rel="prev"
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::ExtractError;

/// One fetched page: its items and the position of the following page, if any.
#[derive(Debug)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

impl<T, C> Page<T, C> {
    pub fn new(items: Vec<T>, next: Option<C>) -> Self {
        Self { items, next }
    }
}

/// Result of a pagination loop. A request error ends the loop but keeps
/// every item collected before it.
#[derive(Debug)]
pub struct Collected<T> {
    pub items: Vec<T>,
    pub requests: usize,
    pub error: Option<ExtractError>,
}

/// Fetch pages until the cap is reached, the platform reports no further
/// page, a page comes back empty, or a request fails.
///
/// `delay` is applied between page requests, never before the first.
/// The returned items never exceed `cap`.
pub async fn paginate<T, C, F, Fut>(
    cap: usize,
    delay: Duration,
    start: Option<C>,
    mut fetch: F,
) -> Collected<T>
where
    F: FnMut(Option<C>) -> Fut,
    Fut: Future<Output = Result<Page<T, C>, ExtractError>>,
{
    let mut items: Vec<T> = Vec::new();
    let mut cursor = start;
    let mut is_first_page = true;
    let mut requests = 0usize;

    while items.len() < cap {
        if !is_first_page && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        is_first_page = false;

        requests += 1;
        let page = match fetch(cursor.take()).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(error = %e, kept = items.len(), "page request failed; keeping partial results");
                return Collected {
                    items,
                    requests,
                    error: Some(e),
                };
            }
        };

        if page.items.is_empty() {
            break;
        }
        items.extend(page.items);

        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    items.truncate(cap);
    Collected {
        items,
        requests,
        error: None,
    }
}

/// Returns the URL of the `rel="next"` link in a `Link` header value.
#[must_use]
pub fn next_link_url(link_header: Option<&str>) -> Option<String> {
    let header = link_header?;

    for segment in header.split(',') {
        let segment = segment.trim();
        if !segment.contains(r#"rel="next""#) {
            continue;
        }
        return extract_angle_bracket_url(segment).map(str::to_owned);
    }

    None
}

fn extract_angle_bracket_url(segment: &str) -> Option<&str> {
    let start = segment.find('<')? + 1;
    let end = segment.find('>')?;
    if start >= end {
        return None;
    }
    Some(&segment[start..end])
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Serves `pages` pages of `per_page` items each, then reports no continuation.
    async fn run_fixed(per_page: usize, pages: usize, cap: usize) -> (Collected<usize>, usize) {
        let calls = AtomicUsize::new(0);
        let collected = paginate(cap, Duration::ZERO, Some(1usize), |cursor| {
            calls.fetch_add(1, Ordering::SeqCst);
            let page_no = cursor.unwrap_or(1);
            async move {
                let items = (0..per_page).map(|i| page_no * 1000 + i).collect();
                let next = (page_no < pages).then_some(page_no + 1);
                Ok(Page::new(items, next))
            }
        })
        .await;
        (collected, calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn stops_when_no_next_page() {
        let (collected, calls) = run_fixed(10, 3, 200).await;
        assert_eq!(calls, 3);
        assert_eq!(collected.requests, 3);
        assert_eq!(collected.items.len(), 30);
        assert!(collected.error.is_none());
    }

    #[tokio::test]
    async fn truncates_at_cap() {
        let (collected, calls) = run_fixed(100, 5, 200).await;
        assert_eq!(calls, 2);
        assert_eq!(collected.items.len(), 200);

        let (collected, _) = run_fixed(40, 10, 200).await;
        assert_eq!(collected.items.len(), 200);

        let (collected, calls) = run_fixed(30, 10, 100).await;
        assert_eq!(calls, 4);
        assert_eq!(collected.items.len(), 100);
    }

    #[tokio::test]
    async fn empty_page_ends_loop() {
        let calls = AtomicUsize::new(0);
        let collected: Collected<u8> = paginate(200, Duration::ZERO, None::<String>, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Page::new(Vec::new(), Some("again".to_string()))) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(collected.items.is_empty());
    }

    #[tokio::test]
    async fn error_keeps_partial_results() {
        let collected = paginate(200, Duration::ZERO, Some(1u32), |cursor| async move {
            match cursor {
                Some(1) => Ok(Page::new(vec!["a", "b"], Some(2))),
                _ => Err(ExtractError::UnexpectedStatus {
                    status: 500,
                    url: "http://example.test".to_string(),
                }),
            }
        })
        .await;
        assert_eq!(collected.items, vec!["a", "b"]);
        assert_eq!(collected.requests, 2);
        assert!(matches!(
            collected.error,
            Some(ExtractError::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[test]
    fn next_link_from_single_link() {
        let header = r#"<https://mastodon.social/api/v1/accounts/1/statuses?max_id=9>; rel="next""#;
        assert_eq!(
            next_link_url(Some(header)).as_deref(),
            Some("https://mastodon.social/api/v1/accounts/1/statuses?max_id=9")
        );
    }

    #[test]
    fn next_link_from_combined_next_prev() {
        let header = concat!(
            r#"<https://m.test/statuses?max_id=9>; rel="next", "#,
            r#"<https://m.test/statuses?min_id=20>; rel="prev""#
        );
        assert_eq!(
            next_link_url(Some(header)).as_deref(),
            Some("https://m.test/statuses?max_id=9")
        );
    }

    #[test]
    fn next_link_absent() {
        assert!(next_link_url(None).is_none());
        assert!(next_link_url(Some("")).is_none());
        assert!(next_link_url(Some(r#"<https://m.test/s?min_id=1>; rel="prev""#)).is_none());
    }
}
