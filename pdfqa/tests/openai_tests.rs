//! OpenAI clients against a local mock of the embeddings and chat APIs.

mod common;

use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use common::{invoice_pdf, keyword_embedding};
use pdfqa::{
    ApiKey, EmbeddingProvider, GenerationRequest, LanguageModel, OpenAIBackend, OpenAIChatModel,
    OpenAIEmbeddingProvider, QaConfig, QaError, QaPipeline, RetryPolicy,
};
use serde_json::{Value, json};

/// Scripted behaviour and recorded traffic of the mock server.
#[derive(Default)]
struct MockOpenAI {
    embedding_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    /// Number of upcoming requests that fail with `failure_status`.
    failures_remaining: AtomicUsize,
    failure_status: AtomicU16,
    completion: Mutex<String>,
    last_authorization: Mutex<Option<String>>,
    last_embedding_model: Mutex<Option<String>>,
    last_chat_body: Mutex<Option<Value>>,
}

impl MockOpenAI {
    fn fail_next(&self, count: usize, status: StatusCode) {
        self.failure_status.store(status.as_u16(), Ordering::SeqCst);
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    fn scripted_failure(&self) -> Option<Response> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining == 0 {
            return None;
        }
        self.failures_remaining.store(remaining - 1, Ordering::SeqCst);

        let status = StatusCode::from_u16(self.failure_status.load(Ordering::SeqCst))
            .expect("valid status");
        let body = Json(json!({ "error": { "message": format!("scripted {status}") } }));
        if status == StatusCode::TOO_MANY_REQUESTS {
            Some((status, [(header::RETRY_AFTER, "0")], body).into_response())
        } else {
            Some((status, body).into_response())
        }
    }

    fn record_auth(&self, headers: &HeaderMap) {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *self.last_authorization.lock().unwrap() = auth;
    }
}

/// Embeds with the keyword embedding, listing the results in reverse order.
async fn embeddings(
    State(mock): State<Arc<MockOpenAI>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.embedding_calls.fetch_add(1, Ordering::SeqCst);
    mock.record_auth(&headers);
    if let Some(failure) = mock.scripted_failure() {
        return failure;
    }

    *mock.last_embedding_model.lock().unwrap() = body["model"].as_str().map(str::to_string);
    let inputs: Vec<String> = body["input"]
        .as_array()
        .expect("input array")
        .iter()
        .map(|v| v.as_str().expect("string input").to_string())
        .collect();
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(index, text)| {
            json!({ "object": "embedding", "index": index, "embedding": keyword_embedding(text) })
        })
        .collect();
    Json(json!({ "object": "list", "data": data, "model": body["model"] })).into_response()
}

async fn chat_completions(
    State(mock): State<Arc<MockOpenAI>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.chat_calls.fetch_add(1, Ordering::SeqCst);
    mock.record_auth(&headers);
    *mock.last_chat_body.lock().unwrap() = Some(body);
    if let Some(failure) = mock.scripted_failure() {
        return failure;
    }

    let content = mock.completion.lock().unwrap().clone();
    Json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
    }))
    .into_response()
}

async fn spawn_server() -> (String, Arc<MockOpenAI>, tokio::task::JoinHandle<()>) {
    let mock = Arc::new(MockOpenAI::default());
    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}/v1", addr), mock, handle)
}

fn fast_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
    }
}

fn embedder(base_url: &str) -> OpenAIEmbeddingProvider {
    OpenAIEmbeddingProvider::new("sk-test")
        .expect("provider")
        .with_base_url(base_url)
        .with_retry_policy(fast_retries(2))
}

fn chat_model(base_url: &str) -> OpenAIChatModel {
    OpenAIChatModel::new("sk-test")
        .expect("chat model")
        .with_base_url(base_url)
        .with_model("gpt-test")
        .with_retry_policy(fast_retries(2))
}

#[tokio::test]
async fn embeddings_are_returned_in_input_order() {
    let (base, mock, handle) = spawn_server().await;
    let texts = ["invoice total", "thank you", "quarterly report"];

    let vectors = embedder(&base).embed_many(&texts).await.unwrap();

    assert_eq!(vectors.len(), 3);
    for (text, vector) in texts.iter().zip(&vectors) {
        assert_eq!(vector, &keyword_embedding(text));
    }
    assert_eq!(mock.last_authorization.lock().unwrap().as_deref(), Some("Bearer sk-test"));

    handle.abort();
}

#[tokio::test]
async fn inputs_are_sent_in_bounded_batches() {
    let (base, mock, handle) = spawn_server().await;
    let texts = ["one", "two", "three", "four", "five"];

    let vectors = embedder(&base).with_batch_size(2).embed_many(&texts).await.unwrap();

    assert_eq!(mock.embedding_calls.load(Ordering::SeqCst), 3);
    let expected: Vec<Vec<f32>> = texts.iter().map(|t| keyword_embedding(t)).collect();
    assert_eq!(vectors, expected);

    handle.abort();
}

#[tokio::test]
async fn rate_limited_request_is_retried() {
    let (base, mock, handle) = spawn_server().await;
    mock.fail_next(1, StatusCode::TOO_MANY_REQUESTS);

    let vector = embedder(&base).embed("invoice").await.unwrap();

    assert_eq!(vector, keyword_embedding("invoice"));
    assert_eq!(mock.embedding_calls.load(Ordering::SeqCst), 2);

    handle.abort();
}

#[tokio::test]
async fn rejected_credentials_are_not_retried() {
    let (base, mock, handle) = spawn_server().await;
    mock.fail_next(10, StatusCode::UNAUTHORIZED);

    let err = embedder(&base).embed("invoice").await.unwrap_err();

    assert!(matches!(err, QaError::Auth { .. }), "got {err:?}");
    assert_eq!(mock.embedding_calls.load(Ordering::SeqCst), 1);

    handle.abort();
}

#[tokio::test]
async fn persistent_server_errors_exhaust_retries() {
    let (base, mock, handle) = spawn_server().await;
    mock.fail_next(10, StatusCode::INTERNAL_SERVER_ERROR);

    let err = embedder(&base).embed("invoice").await.unwrap_err();

    assert!(matches!(err, QaError::ProviderUnavailable { .. }), "got {err:?}");
    assert_eq!(mock.embedding_calls.load(Ordering::SeqCst), 3);

    handle.abort();
}

#[tokio::test]
async fn bad_request_is_a_provider_error() {
    let (base, mock, handle) = spawn_server().await;
    mock.fail_next(1, StatusCode::BAD_REQUEST);

    let err = embedder(&base).embed("invoice").await.unwrap_err();

    match err {
        QaError::Provider { message, .. } => assert!(message.contains("scripted")),
        other => panic!("expected provider error, got {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn chat_completion_sends_prompt_model_and_temperature() {
    let (base, mock, handle) = spawn_server().await;
    *mock.completion.lock().unwrap() = "The total is $450.".into();

    let request = GenerationRequest { prompt: "What is the total?".into(), temperature: 0.0 };
    let reply = chat_model(&base).generate(&request).await.unwrap();

    assert_eq!(reply, "The total is $450.");
    assert_eq!(mock.chat_calls.load(Ordering::SeqCst), 1);
    let body = mock.last_chat_body.lock().unwrap().clone().expect("chat body");
    assert_eq!(body["model"], "gpt-test");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "What is the total?");
    assert_eq!(body["temperature"].as_f64(), Some(0.0));

    handle.abort();
}

#[tokio::test]
async fn empty_completion_is_reported_as_unavailable() {
    let (base, _mock, handle) = spawn_server().await;

    let request = GenerationRequest { prompt: "Anything?".into(), temperature: 0.0 };
    let err = chat_model(&base)
        .with_retry_policy(fast_retries(0))
        .generate(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, QaError::ProviderUnavailable { .. }), "got {err:?}");

    handle.abort();
}

#[tokio::test]
async fn pipeline_answers_through_openai_compatible_server() {
    let (base, mock, handle) = spawn_server().await;
    *mock.completion.lock().unwrap() = "  The invoice total is $450.\n".into();

    let config = QaConfig::builder()
        .base_url(&base)
        .initial_backoff(Duration::from_millis(1))
        .build()
        .unwrap();
    let pipeline = QaPipeline::builder()
        .config(config.clone())
        .backend(Arc::new(OpenAIBackend::new(config)))
        .build()
        .unwrap();

    pipeline.build_index(&invoice_pdf(), &ApiKey::new("sk-test")).await.unwrap();
    let answer = pipeline.answer("What is the invoice total?", Some(1)).await.unwrap();

    assert_eq!(answer.text, "The invoice total is $450.");
    assert_eq!(answer.source_pages, vec![1]);

    let body = mock.last_chat_body.lock().unwrap().clone().expect("chat body");
    let prompt = body["messages"][0]["content"].as_str().expect("prompt");
    assert!(prompt.contains("The invoice total is $450."));
    assert!(prompt.ends_with("Question: What is the invoice total?\nHelpful Answer:"));

    handle.abort();
}

#[tokio::test]
async fn index_dimensions_follow_the_configured_embedding_model() {
    let (base, mock, handle) = spawn_server().await;
    *mock.completion.lock().unwrap() = "The invoice total is $450.".into();

    let config = QaConfig::builder()
        .base_url(&base)
        .embedding_model("text-embedding-3-large")
        .build()
        .unwrap();
    let pipeline = QaPipeline::builder()
        .config(config.clone())
        .backend(Arc::new(OpenAIBackend::new(config)))
        .build()
        .unwrap();

    pipeline.build_index(&invoice_pdf(), &ApiKey::new("sk-test")).await.unwrap();

    let info = pipeline.index_info().await.expect("indexed");
    assert_eq!(info.dimensions, keyword_embedding("any text").len());
    assert_eq!(
        mock.last_embedding_model.lock().unwrap().as_deref(),
        Some("text-embedding-3-large")
    );

    handle.abort();
}
