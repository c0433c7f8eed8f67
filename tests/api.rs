mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{message, TestApp};
use tg_aggregator::config::ChannelSeed;
use tg_aggregator::Config;

async fn app_with_posts() -> TestApp {
    let app = TestApp::new().await;
    app.source.add_messages(
        "chan",
        vec![
            message(1, Some("Eleven transformers")),
            message(2, Some("diffusion models")),
            message(3, Some("reading list")),
        ],
    );
    let (status, _) = app.post("/api/scrape/chan", None).await;
    assert_eq!(status, StatusCode::OK);
    app
}

fn ids(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect()
}

async fn create_tag(app: &TestApp, name: &str) -> i64 {
    let (status, tag) = app.post("/api/tags", Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    tag["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_and_root_are_unprefixed() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn scraping_twice_adds_nothing_new() {
    let app = TestApp::new().await;
    app.source
        .add_messages("chan", (1..=3).map(|id| message(id, Some("post"))).collect());

    let (status, body) = app.post("/api/scrape/chan?limit=100", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["channel"], "chan");
    assert_eq!(body["new_posts"], 3);
    assert_eq!(body["total_messages"], 3);

    let (_, body) = app.post("/api/scrape/@chan", None).await;
    assert_eq!(body["new_posts"], 0);

    let (status, page) = app.get("/api/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(ids(&page), ["chan:3", "chan:2", "chan:1"]);
    assert_eq!(page["items"][0]["is_bookmarked"], false);
    assert_eq!(page["items"][0]["original_url"], "https://t.me/chan/3");
    assert!(!page["items"][0]["tags"].as_array().unwrap().is_empty());

    let (_, channel) = app.get("/api/channels/chan").await;
    assert_eq!(channel["latest_message_id"], 3);
    assert_eq!(app.app.repository.count_channel_posts("chan").await.unwrap(), 3);
}

#[tokio::test]
async fn unavailable_channel_is_a_bad_gateway() {
    let app = TestApp::new().await;

    let (status, body) = app.post("/api/scrape/ghostchan", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["detail"].as_str().unwrap().contains("ghostchan"));

    let (status, _) = app.post("/api/scrape/chan?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post("/api/scrape/chan?limit=1001", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_scrape_reports_failures_as_zero() {
    let config = Config {
        channels: vec![
            ChannelSeed {
                username: "alpha".into(),
                name: None,
                is_active: true,
            },
            ChannelSeed {
                username: "ghostchan".into(),
                name: Some("Ghost".into()),
                is_active: true,
            },
            ChannelSeed {
                username: "paused".into(),
                name: None,
                is_active: false,
            },
        ],
        ..Config::default()
    };
    let app = TestApp::with_config(config).await;
    app.source
        .add_messages("alpha", vec![message(1, Some("a")), message(2, None)]);
    app.source.add_messages("paused", vec![message(1, Some("p"))]);

    let (status, body) = app.post("/api/scrape/all?limit_per_channel=50", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channels_scraped"], 2);
    assert_eq!(body["total_new_posts"], 1);
    assert_eq!(body["total_messages"], 2);
    assert_eq!(body["results"]["alpha"]["new_posts"], 1);
    assert_eq!(body["results"]["ghostchan"]["new_posts"], 0);
    assert_eq!(body["results"]["ghostchan"]["total_messages"], 0);
    assert!(body["results"].get("paused").is_none());
}

#[tokio::test]
async fn virtual_feed_is_read_only() {
    let app = TestApp::new().await;

    let (status, feeds) = app.get("/api/feeds").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feeds[0]["id"], 0);
    assert_eq!(feeds[0]["name"], "All Posts");

    for id in ["all", "0"] {
        let (status, feed) = app.get(&format!("/api/feeds/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(feed["id"], 0);

        let (status, _) = app
            .request("PATCH", &format!("/api/feeds/{id}"), Some(json!({ "name": "x" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.request("DELETE", &format!("/api/feeds/{id}"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn virtual_feed_update_is_refused_before_the_body_is_read() {
    let app = TestApp::new().await;

    let (status, body) = app.request("PATCH", "/api/feeds/all", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "cannot update the 'All Posts' feed");

    let (status, body) = app
        .request("PATCH", "/api/feeds/0", Some(json!({ "name": 5 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "cannot update the 'All Posts' feed");

    let (_, feed) = app
        .post("/api/feeds", Some(json!({ "name": "Mine", "tag_filters": [] })))
        .await;
    let (status, _) = app
        .request("PATCH", &format!("/api/feeds/{}", feed["id"]), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feed_crud_and_filtering() {
    let app = app_with_posts().await;
    let a = create_tag(&app, "feed-a").await;
    app.post("/api/posts/chan:1/tags", Some(json!({ "tag_ids": [a] })))
        .await;

    let (status, feed) = app
        .post(
            "/api/feeds",
            Some(json!({ "name": "Mine", "tag_filters": ["feed-a"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let feed_id = feed["id"].as_i64().unwrap();

    let (_, page) = app.get(&format!("/api/posts?feed_id={feed_id}")).await;
    assert_eq!(ids(&page), ["chan:1"]);

    let (_, page) = app.get("/api/posts?feed_id=all").await;
    assert_eq!(page["total"], 3);

    let (status, feed) = app
        .request(
            "PATCH",
            &format!("/api/feeds/{feed_id}"),
            Some(json!({ "name": "Renamed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["name"], "Renamed");
    assert_eq!(feed["tag_filters"], json!(["feed-a"]));

    let (status, _) = app.request("DELETE", &format!("/api/feeds/{feed_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/feeds/{feed_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bookmark_toggle_round_trip() {
    let app = app_with_posts().await;

    let (status, body) = app.post("/api/bookmarks/chan:2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_bookmarked"], true);
    assert_eq!(body["bookmark"]["post"]["id"], "chan:2");

    let (_, page) = app.get("/api/bookmarks").await;
    assert_eq!(page["total"], 1);
    let (_, post) = app.get("/api/posts/chan:2").await;
    assert_eq!(post["is_bookmarked"], true);

    let (_, body) = app.post("/api/bookmarks/chan:2", None).await;
    assert_eq!(body["is_bookmarked"], false);
    assert!(body["bookmark"].is_null());

    let (status, _) = app.request("DELETE", "/api/bookmarks/chan:2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post("/api/bookmarks/chan:404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tag_filter_returns_each_post_once() {
    let app = app_with_posts().await;
    let a = create_tag(&app, "union-a").await;
    let b = create_tag(&app, "union-b").await;

    app.post("/api/posts/chan:1/tags", Some(json!({ "tag_ids": [a, b] })))
        .await;
    app.post("/api/posts/chan:2/tags", Some(json!({ "tag_ids": [a] })))
        .await;

    let (status, page) = app.get("/api/posts?tags=union-a,union-b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(ids(&page), ["chan:2", "chan:1"]);

    let (_, tags) = app.get("/api/tags").await;
    let union_a = tags
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "union-a")
        .unwrap();
    assert_eq!(union_a["usage_count"], 2);
    assert_eq!(union_a["author_type"], "human");
}

#[tokio::test]
async fn post_tag_edits() {
    let app = app_with_posts().await;
    let a = create_tag(&app, "edit-a").await;

    let (status, post) = app
        .post("/api/posts/chan:3/tags", Some(json!({ "tag_ids": [a] })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(post["tags"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["name"] == "edit-a"));

    let (status, post) = app
        .request(
            "DELETE",
            "/api/posts/chan:3/tags",
            Some(json!({ "tag_ids": [a] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!post["tags"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["name"] == "edit-a"));

    let (status, post) = app
        .request(
            "PATCH",
            "/api/posts/chan:3/tags",
            Some(json!({ "tags": [
                { "name": "only", "author_type": "human" },
                { "name": "machine", "author_type": "llm" }
            ] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = post["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["machine", "only"]);

    let (status, _) = app
        .request("PATCH", "/api/posts/chan:404/tags", Some(json!({ "tags": [] })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_update_and_lookup() {
    let app = app_with_posts().await;

    let (status, post) = app
        .request(
            "PATCH",
            "/api/posts/chan:1",
            Some(json!({ "content": "edited" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["content"], "edited");

    let (status, body) = app.get("/api/posts/chan:999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn pagination_is_validated() {
    let app = app_with_posts().await;

    let (status, _) = app.get("/api/posts?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/posts?limit=101").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/posts?skip=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, page) = app.get("/api/posts?skip=1&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(ids(&page), ["chan:2"]);
}

#[tokio::test]
async fn search_is_case_insensitive() {
    let app = app_with_posts().await;

    let (status, results) = app.get("/api/search?q=eleven").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&results), ["chan:1"]);
    assert_eq!(results["query"], "eleven");

    let (status, _) = app.get("/api/search?q=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, page) = app.get("/api/posts?search=DIFFUSION").await;
    assert_eq!(ids(&page), ["chan:2"]);
}

#[tokio::test]
async fn tag_names_are_unique() {
    let app = TestApp::new().await;
    create_tag(&app, "dup").await;

    let (status, _) = app.post("/api/tags", Some(json!({ "name": "dup" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.request("DELETE", "/api/tags/dup", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.request("DELETE", "/api/tags/dup", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn channel_registration_preseeds_cursor() {
    let app = TestApp::new().await;
    app.source
        .add_messages("busy", (1..=50).map(|id| message(id, Some("x"))).collect());

    let (status, channel) = app
        .post("/api/channels", Some(json!({ "username": "@busy" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(channel["username"], "busy");
    assert_eq!(channel["name"], "busy title");
    assert_eq!(channel["latest_message_id"], 45);

    let (status, _) = app
        .post("/api/channels", Some(json!({ "username": "busy" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.post("/api/scrape/busy", None).await;
    assert_eq!(body["new_posts"], 5);

    let (status, channel) = app
        .request(
            "PATCH",
            "/api/channels/busy",
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(channel["is_active"], false);

    let (status, _) = app.request("DELETE", "/api/channels/busy", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get("/api/channels/busy").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Posts outlive the channel record.
    let (_, page) = app.get("/api/posts").await;
    assert_eq!(page["total"], 5);
}

#[tokio::test]
async fn admin_tagging_endpoints() {
    let app = app_with_posts().await;

    let (status, _) = app.post("/api/admin/tag-post/chan:1?num_tags=6", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post("/api/admin/tag-post/chan:1?num_tags=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tags_assigned"], 2);
    assert_eq!(body["tags"][0]["author_type"], "llm");

    // Every scraped post was tagged on ingestion already.
    let (status, body) = app.post("/api/admin/tag-untagged?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "processed": 0, "tagged": 0 }));

    let (status, _) = app.post("/api/admin/tag-post/chan:404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_prefix_mounts_api_at_root() {
    let app = TestApp::with_config(Config {
        api_prefix: String::new(),
        ..Config::default()
    })
    .await;

    let (status, page) = app.get("/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 0);
}
