mod common;

use cafebot::line::LineClient;
use cafebot::llm::{ChatModel, OpenRouterClient};
use cafebot::vectorstore::{DocumentMetadata, PineconeStore, VectorRecord, VectorStore};
use cafebot::BotError;
use httpmock::prelude::*;
use serde_json::json;

fn record(i: usize) -> VectorRecord {
    VectorRecord {
        id: format!("cafe_{i}"),
        values: vec![0.1, 0.2, 0.3],
        metadata: DocumentMetadata {
            title: format!("doc {i}"),
            content: "content".to_string(),
            source_url: String::new(),
            kind: "menu".to_string(),
        },
    }
}

#[tokio::test]
async fn pinecone_query_maps_matches() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.vector_store.controller_url = server.base_url();
    settings.vector_store.index_host = Some(server.base_url());

    let query_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/query")
            .header("Api-Key", "pc-key")
            .header("X-Pinecone-API-Version", "2024-07")
            .json_body_partial(r#"{"topK": 4, "includeMetadata": true}"#);
        then.status(200).json_body(json!({
            "matches": [
                { "id": "cafe_0", "score": 0.91, "metadata": { "title": "ลาเต้", "content": "65 บาท", "type": "menu" } },
                { "id": "cafe_3", "score": 0.40 }
            ],
            "namespace": ""
        }));
    });

    let store = PineconeStore::new(&settings.vector_store, "pc-key").unwrap();
    let docs = store.query(&[0.1, 0.2, 0.3], 4).await.unwrap();

    query_mock.assert();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].title, "ลาเต้");
    assert_eq!(docs[0].content, "65 บาท");
    assert!((docs[0].score - 0.91).abs() < 1e-6);
    assert_eq!(docs[1].id, "cafe_3");
    assert_eq!(docs[1].title, "");
}

#[tokio::test]
async fn pinecone_resolves_host_from_control_plane() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.vector_store.controller_url = server.base_url();
    settings.vector_store.index_host = None;

    let describe_mock = server.mock(|when, then| {
        when.method(GET).path("/indexes/cafe-line-bot");
        then.status(200).json_body(json!({
            "name": "cafe-line-bot",
            "dimension": 384,
            "metric": "cosine",
            "host": server.base_url(),
            "status": { "ready": true, "state": "Ready" }
        }));
    });
    let query_mock = server.mock(|when, then| {
        when.method(POST).path("/query");
        then.status(200).json_body(json!({ "matches": [] }));
    });

    let store = PineconeStore::new(&settings.vector_store, "pc-key").unwrap();
    assert!(store.query(&[0.1], 4).await.unwrap().is_empty());
    assert!(store.query(&[0.1], 4).await.unwrap().is_empty());

    // The host is looked up once and reused
    describe_mock.assert_hits(1);
    query_mock.assert_hits(2);
}

#[tokio::test]
async fn pinecone_ensure_index_skips_existing() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.vector_store.controller_url = server.base_url();

    let list_mock = server.mock(|when, then| {
        when.method(GET).path("/indexes");
        then.status(200).json_body(json!({ "indexes": [{ "name": "cafe-line-bot", "host": "h" }] }));
    });
    let create_mock = server.mock(|when, then| {
        when.method(POST).path("/indexes");
        then.status(201);
    });

    let store = PineconeStore::new(&settings.vector_store, "pc-key").unwrap();
    store.ensure_index(384, "cosine").await.unwrap();

    list_mock.assert();
    create_mock.assert_hits(0);
}

#[tokio::test]
async fn pinecone_ensure_index_creates_serverless_index() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.vector_store.controller_url = server.base_url();

    server.mock(|when, then| {
        when.method(GET).path("/indexes");
        then.status(200).json_body(json!({ "indexes": [] }));
    });
    let create_mock = server.mock(|when, then| {
        when.method(POST).path("/indexes").json_body(json!({
            "name": "cafe-line-bot",
            "dimension": 384,
            "metric": "cosine",
            "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
        }));
        then.status(201).json_body(json!({ "name": "cafe-line-bot" }));
    });
    let describe_mock = server.mock(|when, then| {
        when.method(GET).path("/indexes/cafe-line-bot");
        then.status(200).json_body(json!({
            "name": "cafe-line-bot",
            "host": "cafe-line-bot-x.svc.pinecone.io",
            "status": { "ready": true, "state": "Ready" }
        }));
    });

    let store = PineconeStore::new(&settings.vector_store, "pc-key").unwrap();
    store.ensure_index(384, "cosine").await.unwrap();

    create_mock.assert();
    describe_mock.assert();
}

#[tokio::test]
async fn pinecone_upsert_is_batched() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.vector_store.index_host = Some(server.base_url());
    settings.vector_store.upsert_batch_size = 2;

    let upsert_mock = server.mock(|when, then| {
        when.method(POST).path("/vectors/upsert").body_contains("\"type\":\"menu\"");
        then.status(200).json_body(json!({ "upsertedCount": 2 }));
    });

    let store = PineconeStore::new(&settings.vector_store, "pc-key").unwrap();
    let count = store.upsert((0..4).map(record).collect()).await.unwrap();

    assert_eq!(count, 4);
    upsert_mock.assert_hits(2);
}

#[tokio::test]
async fn pinecone_error_status_is_reported() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.vector_store.index_host = Some(server.base_url());

    server.mock(|when, then| {
        when.method(POST).path("/query");
        then.status(401).body("Invalid API Key");
    });

    let store = PineconeStore::new(&settings.vector_store, "bad").unwrap();
    match store.query(&[0.1], 4).await {
        Err(BotError::Upstream { service, status, body }) => {
            assert_eq!(service, "pinecone");
            assert_eq!(status, 401);
            assert_eq!(body, "Invalid API Key");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn openrouter_returns_trimmed_first_choice() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.llm.base_url = format!("{}/api/v1", server.base_url());

    let completion_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/chat/completions")
            .header("Authorization", "Bearer or-key")
            .json_body_partial(
                r#"{"model": "deepseek/deepseek-chat-v3.1:free", "max_tokens": 1000, "messages": [{"role": "user", "content": "hello"}]}"#,
            );
        then.status(200).json_body(json!({
            "choices": [{ "message": { "role": "assistant", "content": "  สวัสดีค่ะ ☕  \n" } }]
        }));
    });

    let client = OpenRouterClient::new(&settings.llm, "or-key").unwrap();
    let answer = client.complete("hello").await.unwrap();

    completion_mock.assert();
    assert_eq!(answer, "สวัสดีค่ะ ☕");
}

#[tokio::test]
async fn openrouter_error_status_and_empty_choices() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.llm.base_url = server.base_url();

    let mut limited = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(429).body("rate limited");
    });

    let client = OpenRouterClient::new(&settings.llm, "or-key").unwrap();
    assert!(matches!(
        client.complete("hi").await,
        Err(BotError::Upstream { status: 429, .. })
    ));

    limited.delete();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(json!({ "choices": [] }));
    });
    assert!(matches!(
        client.complete("hi").await,
        Err(BotError::InvalidResponse { .. })
    ));
}

#[tokio::test]
async fn line_reply_posts_message_with_quick_replies() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.line.api_base = server.base_url();

    let reply_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v2/bot/message/reply")
            .header("Authorization", "Bearer line-token")
            .json_body(json!({
                "replyToken": "reply-1",
                "messages": [{
                    "type": "text",
                    "text": "เปิด 7 โมงค่ะ",
                    "quickReply": { "items": [
                        { "type": "action", "action": { "type": "message", "label": "☕ เมนู", "text": "☕ เมนู" } }
                    ] }
                }]
            }));
        then.status(200).json_body(json!({}));
    });

    let client = LineClient::new(&settings.line, "line-token").unwrap();
    client
        .reply("reply-1", "เปิด 7 โมงค่ะ", &["☕ เมนู".to_string()])
        .await
        .unwrap();

    reply_mock.assert();
}

#[tokio::test]
async fn line_reply_error_is_reported() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.line.api_base = server.base_url();

    server.mock(|when, then| {
        when.method(POST).path("/v2/bot/message/reply");
        then.status(400).json_body(json!({ "message": "Invalid reply token" }));
    });

    let client = LineClient::new(&settings.line, "line-token").unwrap();
    let err = client.reply("expired", "hi", &[]).await.unwrap_err();
    assert!(matches!(err, BotError::Upstream { service: "line", status: 400, .. }));
}

#[tokio::test]
async fn openrouter_accepts_only_plain_ok() {
    let server = MockServer::start();
    let (_dir, mut settings) = common::settings();
    settings.llm.base_url = server.base_url();

    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(202).json_body(json!({
            "choices": [{ "message": { "role": "assistant", "content": "queued" } }]
        }));
    });

    let client = OpenRouterClient::new(&settings.llm, "or-key").unwrap();
    match client.complete("hi").await {
        Err(BotError::Upstream { service, status, .. }) => {
            assert_eq!(service, "openrouter");
            assert_eq!(status, 202);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
