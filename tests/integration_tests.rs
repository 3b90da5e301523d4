//! Integration tests for the translation gateway
//!
//! These tests run the real axum router on an ephemeral port and talk to it
//! over HTTP. The model server is either an in-process stub loader or a
//! wiremock server behind the real `RemoteModelLoader`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use translation_gateway::backend::RemoteModelLoader;
use translation_gateway::config::Config;
use translation_gateway::detect::HeuristicDetector;
use translation_gateway::handler::{TranslationService, PASSTHROUGH_NOTE};
use translation_gateway::model::{ModelLoader, TranslationModel};
use translation_gateway::retry::RetryConfig;
use translation_gateway::server::router;

// ==================== Test Helpers ====================

/// Model that answers `"<target> text"` and rejects target `xx`.
struct TaggingModel;

#[async_trait]
impl TranslationModel for TaggingModel {
    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        target_lang: &str,
        _beam_size: u32,
    ) -> Result<String> {
        if target_lang == "xx" {
            anyhow::bail!("language pair not supported by model");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(format!("<{}> {}", target_lang, text))
    }
}

#[derive(Default)]
struct CountingLoader {
    loads: AtomicUsize,
}

#[async_trait]
impl ModelLoader for CountingLoader {
    async fn load(&self, _model_id: &str) -> Result<Arc<dyn TranslationModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok(Arc::new(TaggingModel))
    }
}

/// Start the gateway on an ephemeral port and return its base URL.
async fn spawn_gateway(loader: Arc<dyn ModelLoader>) -> String {
    let config = Config::default();
    let service = Arc::new(TranslationService::from_config(
        &config,
        loader,
        Arc::new(HeuristicDetector::new()),
    ));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, router(service))
            .await
            .expect("server error");
    });

    format!("http://{}", addr)
}

async fn post_translate(base: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/translate", base))
        .json(&body)
        .send()
        .await
        .expect("request failed");
    let status = response.status().as_u16();
    let json = response.json().await.expect("response was not JSON");
    (status, json)
}

async fn get_json(url: &str) -> Value {
    reqwest::get(url)
        .await
        .expect("request failed")
        .json()
        .await
        .expect("response was not JSON")
}

// ==================== Translate Endpoint Tests ====================

#[tokio::test]
async fn test_french_is_detected_and_translated_to_english() {
    let base = spawn_gateway(Arc::new(CountingLoader::default())).await;

    let (status, body) = post_translate(&base, json!({ "text": "Bonjour le monde" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["translation"], "<en> Bonjour le monde");
    assert_eq!(body["model"], "m2m_100_418M");
    assert_eq!(body["source_lang"], "fr");
    assert_eq!(body["target_lang"], "en");
    assert!(body["duration_seconds"].as_f64().unwrap() >= 0.0);
    assert!(body["started_at"].is_string());
    assert!(body["finished_at"].is_string());
    assert!(body.get("note").is_none());
}

#[tokio::test]
async fn test_explicit_languages_translate_directly() {
    let base = spawn_gateway(Arc::new(CountingLoader::default())).await;

    let (status, body) = post_translate(
        &base,
        json!({ "text": "Hello there", "source_lang": "EN", "target_lang": "Fr" }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["translation"], "<fr> Hello there");
    assert_eq!(body["source_lang"], "en");
    assert_eq!(body["target_lang"], "fr");
}

#[tokio::test]
async fn test_english_text_is_passed_through() {
    let base = spawn_gateway(Arc::new(CountingLoader::default())).await;

    let (status, body) = post_translate(&base, json!({ "text": "Hello there" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["translation"], "Hello there");
    assert_eq!(body["source_lang"], "en");
    assert_eq!(body["target_lang"], "en");
    assert_eq!(body["duration_seconds"].as_f64(), Some(0.0));
    assert_eq!(body["started_at"], body["finished_at"]);
    assert_eq!(body["note"], PASSTHROUGH_NOTE);
}

#[tokio::test]
async fn test_unknown_model_returns_400_with_available_models() {
    let loader = Arc::new(CountingLoader::default());
    let base = spawn_gateway(loader.clone()).await;

    let (status, body) =
        post_translate(&base, json!({ "text": "x", "model": "not-a-real-model" })).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "unknown_model");
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("not-a-real-model"));
    assert_eq!(
        body["available_models"],
        json!(["m2m_100_418M", "m2m_100_1.2B"])
    );
    assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_model_failure_returns_500() {
    let base = spawn_gateway(Arc::new(CountingLoader::default())).await;

    let (status, body) = post_translate(
        &base,
        json!({ "text": "Hola mundo", "target_lang": "xx" }),
    )
    .await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "translation_failed");
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("language pair not supported"));
}

#[tokio::test]
async fn test_missing_text_is_rejected() {
    let base = spawn_gateway(Arc::new(CountingLoader::default())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/translate", base))
        .json(&json!({ "source_lang": "fr" }))
        .send()
        .await
        .expect("request failed");

    assert!(response.status().is_client_error());
}

// ==================== Health Endpoint Tests ====================

#[tokio::test]
async fn test_health_reports_loaded_models() {
    let base = spawn_gateway(Arc::new(CountingLoader::default())).await;

    let health = get_json(&format!("{}/", base)).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["default_model"], "m2m_100_418M");
    assert_eq!(health["loaded_models"], json!([]));

    post_translate(
        &base,
        json!({ "text": "Hallo Welt", "model": "m2m_100_1.2B" }),
    )
    .await;
    post_translate(&base, json!({ "text": "Hallo Welt" })).await;

    let health = get_json(&format!("{}/", base)).await;
    assert_eq!(
        health["loaded_models"],
        json!(["m2m_100_1.2B", "m2m_100_418M"])
    );
}

#[tokio::test]
async fn test_metrics_endpoint_counts_requests() {
    let base = spawn_gateway(Arc::new(CountingLoader::default())).await;

    post_translate(&base, json!({ "text": "Hello there" })).await;
    post_translate(&base, json!({ "text": "Bonjour le monde" })).await;
    post_translate(&base, json!({ "text": "x", "model": "nope" })).await;

    let metrics = get_json(&format!("{}/metrics", base)).await;
    assert_eq!(metrics["requests"], 3);
    assert_eq!(metrics["passthroughs"], 1);
    assert_eq!(metrics["translations"], 1);
    assert_eq!(metrics["unknown_models"], 1);
}

// ==================== Concurrency Tests ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_load_model_once() {
    let loader = Arc::new(CountingLoader::default());
    let base = spawn_gateway(loader.clone()).await;

    let requests = (0..12).map(|i| {
        let base = base.clone();
        async move {
            post_translate(
                &base,
                json!({ "text": format!("Hola mundo {}", i), "model": "m2m_100_1.2B" }),
            )
            .await
        }
    });
    let responses = futures::future::join_all(requests).await;

    assert!(responses.iter().all(|(status, _)| *status == 200));
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

// ==================== Model Server Tests ====================

#[tokio::test]
async fn test_end_to_end_with_model_server() {
    let model_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/model_name"))
        .respond_with(ResponseTemplate::new(200).set_body_string("m2m_100_418M"))
        .expect(1)
        .mount(&model_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/translate"))
        .and(body_partial_json(json!({
            "source_lang": "de",
            "target_lang": "en",
            "beam_size": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "translated": "Hello world",
            "translation_time": 0.12
        })))
        .expect(2)
        .mount(&model_server)
        .await;

    let loader = RemoteModelLoader::new(&model_server.uri())
        .expect("client should build")
        .with_retry(RetryConfig::new(2, Duration::from_millis(10)));
    let base = spawn_gateway(Arc::new(loader)).await;

    for _ in 0..2 {
        let (status, body) = post_translate(&base, json!({ "text": "Hallo Welt" })).await;
        assert_eq!(status, 200);
        assert_eq!(body["translation"], "Hello world");
        assert_eq!(body["source_lang"], "de");
    }
}

#[tokio::test]
async fn test_unreachable_model_server_returns_500() {
    let model_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/model_name"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&model_server)
        .await;

    let loader = RemoteModelLoader::new(&model_server.uri())
        .expect("client should build")
        .with_retry(RetryConfig::new(2, Duration::from_millis(10)));
    let base = spawn_gateway(Arc::new(loader)).await;

    let (status, body) = post_translate(&base, json!({ "text": "Hallo Welt" })).await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "translation_failed");
    assert!(body["detail"].as_str().unwrap().contains("m2m_100_418M"));

    let health = get_json(&format!("{}/", base)).await;
    assert_eq!(health["loaded_models"], json!([]));
}

#[tokio::test]
async fn test_passthrough_answers_while_model_server_is_down() {
    let model_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/model_name"))
        .respond_with(ResponseTemplate::new(503))
        .expect(0)
        .mount(&model_server)
        .await;

    let loader = RemoteModelLoader::new(&model_server.uri())
        .expect("client should build")
        .with_retry(RetryConfig::new(2, Duration::from_millis(10)));
    let base = spawn_gateway(Arc::new(loader)).await;

    let (status, body) = post_translate(&base, json!({ "text": "Hello there" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["translation"], "Hello there");
    assert_eq!(body["note"], PASSTHROUGH_NOTE);
}
