//! Integration tests for the search-then-pick platforms (Stack Overflow, YouTube).

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mosaic_extract::platforms::{StackOverflowClient, YoutubeClient};
use mosaic_extract::{
    ClientSettings, EventKind, ExtractError, FixedPicker, HttpClient, RecordingReporter,
};

fn http() -> HttpClient {
    HttpClient::new(ClientSettings::without_delays()).expect("failed to build HttpClient")
}

// ---------------------------------------------------------------------------
// Stack Overflow
// ---------------------------------------------------------------------------

fn so_user(id: u64) -> serde_json::Value {
    json!({
        "user_id": id,
        "display_name": format!("dev{id}"),
        "link": format!("https://stackoverflow.com/users/{id}"),
        "reputation": 1000 - id,
        "badge_counts": {"gold": 1, "silver": 2, "bronze": 3},
        "creation_date": 1_222_430_705
    })
}

async fn mount_so_search(server: &MockServer) {
    let users: Vec<serde_json::Value> = (1..=5).map(so_user).collect();
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("inname", "dev"))
        .and(query_param("site", "stackoverflow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": users, "has_more": false})))
        .mount(server)
        .await;
}

async fn mount_so_profile(server: &MockServer, id: u64, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/users/{id}")))
        .and(query_param("filter", "withbody"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [so_user(id)]})))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn so_client(server: &MockServer, selection: &str, reporter: Arc<RecordingReporter>) -> StackOverflowClient {
    StackOverflowClient::with_base_url(
        http(),
        reporter,
        Arc::new(FixedPicker(selection.to_string())),
        None,
        &server.uri(),
    )
}

#[tokio::test]
async fn stackoverflow_extracts_only_selected_users() {
    let server = MockServer::start().await;
    mount_so_search(&server).await;
    mount_so_profile(&server, 1, 1).await;
    mount_so_profile(&server, 2, 0).await;
    mount_so_profile(&server, 3, 1).await;

    let first_page: Vec<serde_json::Value> = (0..100).map(|i| json!({"question_id": i})).collect();
    let second_page: Vec<serde_json::Value> = (100..130).map(|i| json!({"question_id": i})).collect();
    Mock::given(method("GET"))
        .and(path("/users/1/questions"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": first_page, "has_more": true})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/1/questions"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": second_page, "has_more": false})))
        .mount(&server)
        .await;

    let reporter = Arc::new(RecordingReporter::new());
    let doc = so_client(&server, "1,3", reporter.clone())
        .fetch_document("dev")
        .await
        .unwrap();

    assert_eq!(doc.total_users, 2);
    assert_eq!(doc.users[0].user_info.user_id, 1);
    assert_eq!(doc.users[1].user_info.user_id, 3);
    assert_eq!(doc.users[0].questions.len(), 130);
    assert!(doc.users[1].questions.is_empty(), "unmocked sections degrade to empty");
    assert_eq!(doc.users[0].user_info.creation_date.as_deref(), Some("2008-09-26"));
}

#[tokio::test]
async fn stackoverflow_invalid_selection_falls_back_to_first_user() {
    let server = MockServer::start().await;
    mount_so_search(&server).await;
    mount_so_profile(&server, 1, 1).await;

    let reporter = Arc::new(RecordingReporter::new());
    let doc = so_client(&server, "99", reporter.clone())
        .fetch_document("dev")
        .await
        .unwrap();

    assert_eq!(doc.total_users, 1);
    assert_eq!(doc.users[0].user_info.user_id, 1);
    assert!(reporter
        .messages(EventKind::Warning)
        .iter()
        .any(|m| m.contains("Invalid selection")));
}

#[tokio::test]
async fn stackoverflow_empty_search_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [], "has_more": false})))
        .mount(&server)
        .await;

    let result = so_client(&server, "all", Arc::new(RecordingReporter::new()))
        .fetch_document("nobody")
        .await;
    assert!(
        matches!(result, Err(ExtractError::NotFound { .. })),
        "expected NotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn stackoverflow_sends_api_key_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("key", "se-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = StackOverflowClient::with_base_url(
        http(),
        Arc::new(RecordingReporter::new()),
        Arc::new(FixedPicker::default()),
        Some("se-key".to_string()),
        &server.uri(),
    );
    let _ = client.fetch_document("dev").await;
}

// ---------------------------------------------------------------------------
// YouTube
// ---------------------------------------------------------------------------

fn yt_channel(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "snippet": {
            "title": format!("Channel {id}"),
            "description": "about",
            "publishedAt": "2015-03-01T00:00:00Z",
            "thumbnails": {"high": {"url": format!("https://img.example/{id}.jpg")}}
        },
        "statistics": {"subscriberCount": "1200", "videoCount": "42", "viewCount": "99000"}
    })
}

async fn mount_yt_search(server: &MockServer) {
    let items: Vec<serde_json::Value> = ["UC1", "UC2", "UC3"]
        .iter()
        .map(|id| json!({"id": {"kind": "youtube#channel", "channelId": id}, "snippet": {"title": id}}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("type", "channel"))
        .and(query_param("key", "yt-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": items})))
        .mount(server)
        .await;
    // Statistics come back in a different order than the search ranking.
    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("id", "UC1,UC2,UC3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [yt_channel("UC3"), yt_channel("UC1"), yt_channel("UC2")]
        })))
        .mount(server)
        .await;
    for id in ["UC1", "UC2", "UC3"] {
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("id", id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [yt_channel(id)]})))
            .mount(server)
            .await;
    }
}

fn yt_client(server: &MockServer, selection: &str, reporter: Arc<RecordingReporter>) -> YoutubeClient {
    YoutubeClient::with_base_url(
        http(),
        reporter,
        Arc::new(FixedPicker(selection.to_string())),
        "yt-key".to_string(),
        &server.uri(),
    )
}

fn video_page(channel: &str, count: usize, token: Option<&str>) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            json!({
                "id": {"kind": "youtube#video", "videoId": format!("{channel}-v{i}")},
                "snippet": {"title": format!("Video {i}"), "publishedAt": "2024-01-01T00:00:00Z"}
            })
        })
        .collect();
    match token {
        Some(token) => json!({"items": items, "nextPageToken": token}),
        None => json!({"items": items}),
    }
}

#[tokio::test]
async fn youtube_extracts_selected_channels_with_capped_videos() {
    let server = MockServer::start().await;
    mount_yt_search(&server).await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("type", "video"))
        .and(query_param("channelId", "UC1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(video_page("UC1", 50, Some("next"))))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("type", "video"))
        .and(query_param("channelId", "UC3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(video_page("UC3", 7, None)))
        .expect(1)
        .mount(&server)
        .await;

    let doc = yt_client(&server, "1,3", Arc::new(RecordingReporter::new()))
        .fetch_document("channel")
        .await
        .unwrap();

    assert_eq!(doc.total_channels, 2);
    assert_eq!(doc.channels[0].channel_info.id, "UC1");
    assert_eq!(doc.channels[0].channel_info.subscribers, 1200);
    assert_eq!(doc.channels[0].videos.len(), 100);
    assert_eq!(doc.channels[1].channel_info.id, "UC3");
    assert_eq!(doc.channels[1].videos.len(), 7);
    assert_eq!(
        doc.channels[1].videos[0].url,
        "https://www.youtube.com/watch?v=UC3-v0"
    );
}

#[tokio::test]
async fn youtube_invalid_selection_falls_back_to_first_channel() {
    let server = MockServer::start().await;
    mount_yt_search(&server).await;

    let reporter = Arc::new(RecordingReporter::new());
    let doc = yt_client(&server, "first one", reporter.clone())
        .fetch_document("channel")
        .await
        .unwrap();

    assert_eq!(doc.total_channels, 1);
    assert_eq!(doc.channels[0].channel_info.id, "UC1");
    assert!(doc.channels[0].videos.is_empty());
    assert!(reporter
        .messages(EventKind::Warning)
        .iter()
        .any(|m| m.contains("Invalid selection")));
}
