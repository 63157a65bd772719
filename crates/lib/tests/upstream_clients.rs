use httpmock::prelude::*;
use lib::channels::{ChannelError, ChannelHandle, LineClient, MediaBlob};
use lib::llm::{
    Completion, GeminiClient, IMAGE_PROMPT, IMAGE_REPLY_ERROR, IMAGE_REPLY_NO_ANSWER,
    TEXT_REPLY_ERROR,
};
use serde_json::json;

fn unreachable_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    let port = listener.local_addr().expect("local_addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn gemini(base: String) -> GeminiClient {
    GeminiClient::new(
        "test-gemini-key".to_string(),
        Some("gemini-1.5-flash".to_string()),
        Some(base),
    )
}

fn sample_image() -> MediaBlob {
    MediaBlob {
        mime_type: "image/jpeg".to_string(),
        data: "/9j/4AAQ".to_string(),
    }
}

#[tokio::test]
async fn gemini_text_completion_sends_key_and_message() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent")
            .query_param("key", "test-gemini-key")
            .header("content-type", "application/json")
            .json_body_includes(
                json!({"contents": [{"parts": [{"text": "what is rust?"}]}]}).to_string(),
            );
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text": "A language."}], "role": "model"}}],
            "usageMetadata": {"promptTokenCount": 4, "totalTokenCount": 7}
        }));
    });

    let reply = gemini(format!("{}/v1beta", server.base_url()))
        .complete_text("what is rust?")
        .await;

    mock.assert();
    assert_eq!(reply.text, "A language.");
}

#[tokio::test]
async fn gemini_error_status_yields_error_fallback() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/models/gemini-1.5-flash:generateContent");
        then.status(429)
            .json_body(json!({"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}}));
    });

    let reply = gemini(server.base_url()).complete_text("hello").await;

    mock.assert_calls(1);
    assert_eq!(reply.text, TEXT_REPLY_ERROR);
}

#[tokio::test]
async fn gemini_malformed_body_yields_error_fallback() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/models/gemini-1.5-flash:generateContent");
        then.status(200)
            .header("content-type", "application/json")
            .body("<html>upstream proxy error</html>");
    });

    let reply = gemini(server.base_url()).complete_text("hello").await;

    mock.assert_calls(1);
    assert_eq!(reply.text, TEXT_REPLY_ERROR);
}

#[tokio::test]
async fn gemini_unreachable_image_completion_yields_image_error_fallback() {
    let reply = gemini(unreachable_base())
        .complete_image(&sample_image())
        .await;
    assert_eq!(reply.text, IMAGE_REPLY_ERROR);
}

#[tokio::test]
async fn gemini_image_completion_without_text_yields_image_fallback() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/models/gemini-1.5-flash:generateContent")
            .json_body_includes(
                json!({
                    "contents": [
                        {"parts": [{"text": IMAGE_PROMPT}]},
                        {"parts": [{"inline_data": {"mime_type": "image/jpeg", "data": "/9j/4AAQ"}}]}
                    ]
                })
                .to_string(),
            );
        then.status(200)
            .json_body(json!({"candidates": [{"content": {"parts": [{"text": ""}]}}]}));
    });

    let reply = gemini(server.base_url())
        .complete_image(&sample_image())
        .await;

    mock.assert_calls(1);
    assert_eq!(reply.text, IMAGE_REPLY_NO_ANSWER);
}

#[tokio::test]
async fn line_fetch_content_uses_bearer_token_and_base64() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/bot/message/100001/content")
            .header("authorization", "Bearer test-line-token");
        then.status(200)
            .header("content-type", "image/jpeg")
            .body([0xFFu8, 0xD8, 0xFF, 0xE0]);
    });
    let line = LineClient::new("test-line-token".to_string(), None, Some(server.base_url()));

    let blob = line.fetch_content("100001").await;

    mock.assert();
    assert_eq!(
        blob,
        Some(MediaBlob {
            mime_type: "image/jpeg".to_string(),
            data: "/9j/4A==".to_string(),
        })
    );
}

#[tokio::test]
async fn line_fetch_content_failures_are_none() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/v2/bot/message/404/content");
        then.status(404).json_body(json!({"message": "Not found"}));
    });
    let line = LineClient::new("t".to_string(), None, Some(server.base_url()));
    assert_eq!(line.fetch_content("404").await, None);
    mock.assert_calls(1);

    let line = LineClient::new("t".to_string(), None, Some(unreachable_base()));
    assert_eq!(line.fetch_content("1").await, None);
}

#[tokio::test]
async fn line_reply_posts_single_text_message() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v2/bot/message/reply")
            .header("authorization", "Bearer test-line-token")
            .json_body_includes(
                json!({
                    "replyToken": "nHuyWiB7yP5Zw52FIkcQobQuGDXCTA",
                    "messages": [{"type": "text", "text": "สวัสดี"}]
                })
                .to_string(),
            );
        then.status(200).json_body(json!({"sentMessages": [{"id": "1"}]}));
    });
    let line = LineClient::new("test-line-token".to_string(), Some(server.base_url()), None);

    line.reply_text("nHuyWiB7yP5Zw52FIkcQobQuGDXCTA", "สวัสดี")
        .await
        .expect("reply should succeed");

    mock.assert();
}

#[tokio::test]
async fn line_reply_error_status_is_returned() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v2/bot/message/reply");
        then.status(400).json_body(json!({"message": "Invalid reply token"}));
    });
    let line = LineClient::new("t".to_string(), Some(server.base_url()), None);

    let err = line.reply_text("used-token", "hi").await.unwrap_err();

    mock.assert_calls(1);
    match err {
        ChannelError::Api(msg) => assert!(msg.contains("Invalid reply token"), "{}", msg),
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn line_fetch_content_empty_body_is_none() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/v2/bot/message/7/content");
        then.status(200).header("content-type", "image/jpeg").body("");
    });
    let line = LineClient::new("t".to_string(), None, Some(server.base_url()));

    assert_eq!(line.fetch_content("7").await, None);
    let err = line.get_content("7").await.unwrap_err();

    mock.assert_calls(2);
    assert!(matches!(err, ChannelError::Api(ref msg) if msg == "empty content"), "{:?}", err);
}
