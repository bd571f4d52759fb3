//! Chat-completions adapter against a local fake server

use mig_backend::{
    AuthScheme, ChatCompletionsService, ChatServiceConfig, RequestKind, ServiceError,
    TransformRequest, TransformationService,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use warp::http::StatusCode;
use warp::Filter;

macro_rules! spawn {
    ($routes:expr) => {{
        let (addr, server) = warp::serve($routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }};
}

fn translate_request() -> TransformRequest {
    TransformRequest::new(
        RequestKind::Translate {
            fragment_index: 0,
            fragment_count: 1,
        },
        "       PROCEDURE DIVISION.\n           DISPLAY 'HI'.",
    )
}

#[tokio::test]
async fn returns_message_content() {
    let routes = warp::post()
        .and(warp::path("chat"))
        .and(warp::header::<String>("api-key"))
        .and(warp::body::json())
        .map(|key: String, body: Value| {
            assert_eq!(key, "k-123");
            assert_eq!(body["response_format"]["type"], "json_object");
            warp::reply::json(&json!({
                "choices": [{"message": {"content": "  {\"convertedCode\": \"class A {}\"}  "}}]
            }))
        });
    let addr: SocketAddr = spawn!(routes);

    let service = ChatCompletionsService::from_config(
        ChatServiceConfig::new(format!("http://{addr}/chat"))
            .with_api_key("k-123", AuthScheme::ApiKeyHeader),
    )
    .unwrap();
    let reply = service.transform(&translate_request()).await.unwrap();
    assert_eq!(reply, "{\"convertedCode\": \"class A {}\"}");
}

#[tokio::test]
async fn bearer_auth_is_sent() {
    let routes = warp::post()
        .and(warp::header::<String>("authorization"))
        .map(|auth: String| {
            assert_eq!(auth, "Bearer tok");
            warp::reply::json(&json!({"choices": [{"message": {"content": "ok"}}]}))
        });
    let addr: SocketAddr = spawn!(routes);

    let service = ChatCompletionsService::from_config(
        ChatServiceConfig::new(format!("http://{addr}/")).with_api_key("tok", AuthScheme::Bearer),
    )
    .unwrap();
    assert_eq!(service.transform(&translate_request()).await.unwrap(), "ok");
}

#[tokio::test]
async fn server_error_is_retryable_status() {
    let routes = warp::any().map(|| {
        warp::reply::with_status("overloaded", StatusCode::SERVICE_UNAVAILABLE)
    });
    let addr: SocketAddr = spawn!(routes);

    let service =
        ChatCompletionsService::from_config(ChatServiceConfig::new(format!("http://{addr}/")))
            .unwrap();
    let err = service.transform(&translate_request()).await.unwrap_err();
    assert_eq!(err, ServiceError::status(503, "overloaded"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn empty_choices_is_empty_reply() {
    let routes = warp::any().map(|| warp::reply::json(&json!({"choices": []})));
    let addr: SocketAddr = spawn!(routes);

    let service =
        ChatCompletionsService::from_config(ChatServiceConfig::new(format!("http://{addr}/")))
            .unwrap();
    let err = service.transform(&translate_request()).await.unwrap_err();
    assert_eq!(err, ServiceError::EmptyReply);
}

#[tokio::test]
async fn slow_server_times_out() {
    let routes = warp::any().and_then(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, warp::Rejection>(warp::reply::json(&json!({"choices": []})))
    });
    let addr: SocketAddr = spawn!(routes);

    let service = ChatCompletionsService::from_config(
        ChatServiceConfig::new(format!("http://{addr}/"))
            .with_request_timeout(Duration::from_millis(200)),
    )
    .unwrap();
    let err = service.transform(&translate_request()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Timeout(_)), "{err:?}");
}
