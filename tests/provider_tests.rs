//! Provider adapter tests against a wiremock HTTP server.

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use difftide::error::DifftideError;
use difftide::generation::stream_to_sink;
use difftide::provider;
use difftide::registry::{ModelDescriptor, ProviderDescriptor, ProviderKind};

fn descriptor(kind: ProviderKind, base_url: Option<&str>) -> ProviderDescriptor {
    ProviderDescriptor {
        id: "test".to_string(),
        name: "Test Provider".to_string(),
        kind,
        api_key: "sk-test".to_string(),
        base_url: base_url.map(str::to_string),
        models: vec![ModelDescriptor::plain("gpt-4o")],
        enabled: true,
    }
}

#[tokio::test]
async fn fetch_models_maps_openai_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "gpt-4" }]
            })),
        )
        .mount(&server)
        .await;

    let provider = descriptor(ProviderKind::OpenAiCompatible, Some(&server.uri()));
    let models = provider::fetch_models(&provider).await.unwrap();

    assert_eq!(
        models,
        vec![ModelDescriptor {
            id: "gpt-4".to_string(),
            name: Some("gpt-4".to_string()),
            group: None,
        }]
    );
}

#[tokio::test]
async fn fetch_models_keeps_remote_name_and_group() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "qwen-max", "name": "Qwen Max", "group": "qwen" }]
            })),
        )
        .mount(&server)
        .await;

    let provider = descriptor(ProviderKind::OpenAiCompatible, Some(&server.uri()));
    let models = provider::fetch_models(&provider).await.unwrap();

    assert_eq!(models[0].name.as_deref(), Some("Qwen Max"));
    assert_eq!(models[0].group.as_deref(), Some("qwen"));
}

#[tokio::test]
async fn fetch_models_maps_gemini_envelope_and_strips_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(query_param("key", "sk-test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{ "name": "models/gemini-pro", "displayName": "Gemini Pro" }]
            })),
        )
        .mount(&server)
        .await;

    let provider = descriptor(ProviderKind::Gemini, Some(&server.uri()));
    let models = provider::fetch_models(&provider).await.unwrap();

    assert_eq!(
        models,
        vec![ModelDescriptor {
            id: "gemini-pro".to_string(),
            name: Some("Gemini Pro".to_string()),
            group: None,
        }]
    );
}

#[tokio::test]
async fn fetch_models_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let provider = descriptor(ProviderKind::OpenAiCompatible, Some(&server.uri()));
    match provider::fetch_models(&provider).await {
        Err(DifftideError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_models_missing_data_array_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "object": "list" })),
        )
        .mount(&server)
        .await;

    let provider = descriptor(ProviderKind::OpenAiCompatible, Some(&server.uri()));
    match provider::fetch_models(&provider).await {
        Err(DifftideError::Api { message, .. }) => {
            assert!(message.contains("missing `data` array"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[test]
fn compatible_create_model_requires_a_base_url() {
    let provider = descriptor(ProviderKind::OpenAiCompatible, None);
    match provider::create_model(&provider, "gpt-4o") {
        Err(DifftideError::Configuration(msg)) => assert!(msg.contains("base URL")),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn base_url_scheme_is_validated() {
    let provider = descriptor(ProviderKind::OpenAiCompatible, Some("ftp://example.com"));
    match provider::create_model(&provider, "gpt-4o") {
        Err(DifftideError::Configuration(msg)) => assert!(msg.contains("http://")),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn gemini_without_base_url_reports_missing_native_support() {
    let provider = descriptor(ProviderKind::Gemini, None);
    match provider::create_model(&provider, "gemini-pro") {
        Err(DifftideError::Configuration(msg)) => {
            assert!(msg.contains("native support not implemented"));
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn azure_without_base_url_is_a_configuration_error() {
    let provider = descriptor(ProviderKind::AzureOpenAi, None);
    assert!(matches!(
        provider::create_model(&provider, "gpt-4o"),
        Err(DifftideError::Configuration(_))
    ));
}

#[test]
fn openai_create_model_defaults_the_base_url() {
    let provider = descriptor(ProviderKind::OpenAi, None);
    let handle = provider::create_model(&provider, "gpt-4o").unwrap();
    assert_eq!(handle.model_id(), "gpt-4o");
    assert_eq!(handle.provider_name(), "Test Provider");
}

#[tokio::test]
async fn streaming_completion_forwards_sse_deltas() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"feat\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\": add x\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("\"stream\":true"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = descriptor(ProviderKind::OpenAiCompatible, Some(&server.uri()));
    let handle = provider::create_model(&provider, "gpt-4o").unwrap();

    let mut chunks: Vec<String> = Vec::new();
    let mut sink = |chunk: &str| chunks.push(chunk.to_string());
    let result = stream_to_sink(
        handle.as_ref(),
        "prompt",
        &mut sink,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(chunks, vec!["feat".to_string(), ": add x".to_string()]);
    assert_eq!(result, "feat: add x");
}

#[tokio::test]
async fn blocking_completion_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("\"stream\":false"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "fix: bug" } }]
            })),
        )
        .mount(&server)
        .await;

    let provider = descriptor(ProviderKind::OpenAiCompatible, Some(&server.uri()));
    let handle = provider::create_model(&provider, "gpt-4o").unwrap();

    assert_eq!(handle.generate_text("prompt").await.unwrap(), "fix: bug");
}

#[tokio::test]
async fn empty_sse_stream_falls_back_to_blocking_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("\"stream\":true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("data: [DONE]\n\n", "text/event-stream"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("\"stream\":false"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "fix: bug" } }]
            })),
        )
        .mount(&server)
        .await;

    let provider = descriptor(ProviderKind::OpenAiCompatible, Some(&server.uri()));
    let handle = provider::create_model(&provider, "gpt-4o").unwrap();

    let mut chunks: Vec<String> = Vec::new();
    let mut sink = |chunk: &str| chunks.push(chunk.to_string());
    let result = stream_to_sink(
        handle.as_ref(),
        "prompt",
        &mut sink,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(chunks, vec!["fix: bug".to_string()]);
    assert_eq!(result, "fix: bug");
}

#[tokio::test]
async fn streaming_http_error_fails_before_any_fragment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let provider = descriptor(ProviderKind::OpenAiCompatible, Some(&server.uri()));
    let handle = provider::create_model(&provider, "gpt-4o").unwrap();

    match handle.stream_text("prompt").await {
        Err(DifftideError::Api { status, message }) => {
            assert_eq!(status, 429);
            assert!(message.contains("rate limited"));
        }
        Ok(_) => panic!("expected API error"),
        Err(other) => panic!("expected API error, got {other}"),
    }
}
