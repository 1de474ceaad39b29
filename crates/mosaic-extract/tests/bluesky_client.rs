//! Integration tests for `BlueskyClient`: handle resolution and feed pagination.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mosaic_extract::platforms::BlueskyClient;
use mosaic_extract::{ClientSettings, ExtractError, HttpClient, RecordingReporter};

const DID: &str = "did:plc:alice123";

fn test_client(server: &MockServer) -> BlueskyClient {
    let http = HttpClient::new(ClientSettings::without_delays()).expect("failed to build HttpClient");
    BlueskyClient::with_base_url(http, Arc::new(RecordingReporter::new()), &server.uri())
}

fn feed_page(count: usize, offset: usize, cursor: Option<&str>) -> serde_json::Value {
    let feed: Vec<serde_json::Value> = (offset..offset + count)
        .map(|i| {
            json!({
                "post": {
                    "uri": format!("at://{DID}/app.bsky.feed.post/rk{i}"),
                    "author": {"handle": "alice.bsky.social"},
                    "record": {"text": format!("post {i}"), "createdAt": "2024-05-01T10:00:00Z"},
                    "replyCount": 1,
                    "repostCount": 2,
                    "likeCount": 3
                }
            })
        })
        .collect();
    match cursor {
        Some(cursor) => json!({"feed": feed, "cursor": cursor}),
        None => json!({"feed": feed}),
    }
}

async fn mount_resolution(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.identity.resolveHandle"))
        .and(query_param("handle", "alice.bsky.social"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"did": DID})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .and(query_param("actor", DID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "handle": "alice.bsky.social",
            "displayName": "Alice",
            "followersCount": 10,
            "followsCount": 5,
            "postsCount": 900
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn bare_name_resolves_through_bsky_social_variant() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.identity.resolveHandle"))
        .and(query_param("handle", "alice"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "InvalidRequest"})))
        .mount(&server)
        .await;
    mount_resolution(&server).await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_page(3, 0, None)))
        .mount(&server)
        .await;

    let doc = test_client(&server).fetch_document("@alice").await.unwrap();

    assert_eq!(doc.profile.handle, "alice.bsky.social");
    assert_eq!(doc.profile.profile_url, "https://bsky.app/profile/alice.bsky.social");
    assert_eq!(doc.posts.len(), 3);
    assert_eq!(
        doc.posts[2].url,
        "https://bsky.app/profile/alice.bsky.social/post/rk2"
    );
}

#[tokio::test]
async fn feed_stops_at_two_hundred_posts() {
    let server = MockServer::start().await;
    mount_resolution(&server).await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_page(100, 0, Some("more"))))
        .expect(2)
        .mount(&server)
        .await;

    let doc = test_client(&server)
        .fetch_document("alice.bsky.social")
        .await
        .unwrap();

    assert_eq!(doc.posts.len(), 200);
}

#[tokio::test]
async fn feed_ends_when_cursor_is_absent() {
    let server = MockServer::start().await;
    mount_resolution(&server).await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_page(100, 0, Some("c1"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_page(30, 100, None)))
        .expect(1)
        .mount(&server)
        .await;

    let doc = test_client(&server)
        .fetch_document("alice.bsky.social")
        .await
        .unwrap();

    assert_eq!(doc.posts.len(), 130);
    assert_eq!(doc.posts[129].url, "https://bsky.app/profile/alice.bsky.social/post/rk129");
}

#[tokio::test]
async fn unresolvable_handle_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.identity.resolveHandle"))
        .respond_with(ResponseTemplate::new(400))
        .expect(3)
        .mount(&server)
        .await;

    let result = test_client(&server).fetch_document("nobody").await;
    assert!(
        matches!(result, Err(ExtractError::NotFound { .. })),
        "expected NotFound, got: {result:?}"
    );
}
