//! Session cache persistence and background summary refresh

mod common;

use neuronarrative::client::create_client;
use neuronarrative::emotion::EmotionTag;
use neuronarrative::session::{CacheSettings, ChatMessage, SessionCache, SessionContext};
use neuronarrative::storage::LocalStore;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_conversation_survives_reopen() {
    let (store, dir) = common::create_temp_store();
    let service = create_client(&common::service_config("http://127.0.0.1:9/api")).unwrap();

    {
        let cache = SessionCache::new(store, Arc::clone(&service), CacheSettings::default());
        let mut context = SessionContext::new(1, "ramanujan");
        cache
            .record_turn(
                &mut context,
                ChatMessage::user("what is 2 + 2?", None),
                ChatMessage::assistant("It's 4!", EmotionTag::Excited),
            )
            .unwrap();
        cache.drain().await;
    }

    let store = LocalStore::open(dir.path().join("store")).unwrap();
    let cache = SessionCache::new(store, service, CacheSettings::default());
    let context = cache.load(1, "ramanujan");
    assert_eq!(context.message_count, 2);
    assert_eq!(context.messages[1].text, "It's 4!");

    let index = cache.session_index(1);
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].character_id, "ramanujan");
}

#[tokio::test]
async fn test_summary_refresh_every_fourth_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/summary/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"summary": "Counting games"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sync"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (store, _dir) = common::create_temp_store();
    let service =
        create_client(&common::service_config(&format!("{}/api", server.uri()))).unwrap();
    let cache = SessionCache::new(store, service, CacheSettings::default());
    let mut context = SessionContext::new(2, "ramanujan");

    for i in 0..4 {
        let recorded = cache
            .record_turn(
                &mut context,
                ChatMessage::user(format!("number {}", i), None),
                ChatMessage::assistant("Good counting!", EmotionTag::Happy),
            )
            .unwrap();
        assert_eq!(recorded.summary_requested, i == 3);
    }
    cache.drain().await;

    assert_eq!(cache.load(2, "ramanujan").summary, "Counting games");

    let requests = server.received_requests().await.unwrap();
    let summary = requests
        .iter()
        .find(|r| r.url.path() == "/api/summary/generate")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&summary.body).unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 8);
    assert_eq!(body["character"], "ramanujan");
}
