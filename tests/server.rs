//! HTTP surface: a real axum server on an ephemeral port, called with reqwest.

use async_trait::async_trait;
use paper2podcast::{
    create_router, AppState, ChatBackend, ChatReply, ContentExtractor, ExtractionRequest, Gateway,
    PodcastConfig, PodcastError, PodcastPipeline, Prompt, SamplingConfig, SourceDocument,
    SourceKind,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Replies(Mutex<VecDeque<String>>);

#[async_trait]
impl ChatBackend for Replies {
    async fn chat(
        &self,
        _prompt: &Prompt,
        _sampling: &SamplingConfig,
    ) -> Result<ChatReply, PodcastError> {
        let next = self.0.lock().unwrap().pop_front();
        match next {
            Some(content) => Ok(ChatReply {
                content,
                prompt_tokens: 10,
                completion_tokens: 10,
            }),
            None => Err(PodcastError::LlmApiError {
                message: "no more scripted replies".into(),
            }),
        }
    }
}

struct Abstracts;

#[async_trait]
impl ContentExtractor for Abstracts {
    async fn extract(&self, request: &ExtractionRequest) -> Result<SourceDocument, PodcastError> {
        Ok(SourceDocument {
            locator: request.locator.to_string(),
            paper_id: request.locator.paper_id().to_string(),
            title: None,
            kind: SourceKind::Abstract,
            content: "We study podcasts.".into(),
        })
    }
}

struct SlowModel;

#[async_trait]
impl ChatBackend for SlowModel {
    async fn chat(
        &self,
        _prompt: &Prompt,
        _sampling: &SamplingConfig,
    ) -> Result<ChatReply, PodcastError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(ChatReply::default())
    }
}

fn happy_replies() -> Vec<String> {
    let plan = json!({"title": "T", "description": "D", "segments": ["Intro", "Outro"]});
    let critique = json!({"feedback": "Fine", "suggestions": []});
    let script = json!({
        "speakers": ["Host", "Guest"],
        "content": [
            {"speaker": "Host", "text": "Hello and welcome."},
            {"speaker": "Guest", "text": "Glad to be here."}
        ]
    });
    [&plan, &critique, &plan, &script, &critique, &script]
        .iter()
        .map(|v| v.to_string())
        .collect()
}

/// Serve the router on 127.0.0.1:0 and return its base URL.
async fn spawn_app(backend: Arc<dyn ChatBackend>, timeout: Duration) -> String {
    let gateway = Gateway::new(backend, timeout);
    let pipeline = PodcastPipeline::new(PodcastConfig::default(), Arc::new(Abstracts), gateway);
    let app = create_router(AppState::new(pipeline));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_scripted(replies: Vec<String>) -> String {
    spawn_app(
        Arc::new(Replies(Mutex::new(replies.into()))),
        Duration::from_secs(5),
    )
    .await
}

#[tokio::test]
async fn health_is_ok() {
    let base = spawn_scripted(vec![]).await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn create_podcast_returns_plan_script_and_critique() {
    let base = spawn_scripted(happy_replies()).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/create-podcast"))
        .json(&json!({"url": "https://arxiv.org/abs/2301.00001"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["podcast_plan"]["title"], "T");
    assert_eq!(body["podcast_script"]["speakers"], json!(["Host", "Guest"]));
    assert_eq!(body["critique"]["feedback"], "Fine");
    assert!(body.get("stats").is_none());
}

#[tokio::test]
async fn route_aliases_are_served() {
    for path in ["/create-podcast/", "/create_podcast"] {
        let base = spawn_scripted(happy_replies()).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}{path}"))
            .json(&json!({"url": "https://arxiv.org/abs/2301.00001"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "path {path}");
    }
}

#[tokio::test]
async fn invalid_locator_is_400_with_detail() {
    let base = spawn_scripted(happy_replies()).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/create-podcast"))
        .json(&json!({"url": "not-a-paper-url"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("not-a-paper-url"), "got {detail}");
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let base = spawn_scripted(happy_replies()).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/create-podcast"))
        .header("content-type", "application/json")
        .body(r#"{"link": "https://arxiv.org/abs/2301.00001"}"#)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error(), "got {}", resp.status());
}

#[tokio::test]
async fn model_failure_is_500_with_detail() {
    let base = spawn_scripted(vec!["Here is your plan: talk about the paper.".into()]).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/create-podcast"))
        .json(&json!({"url": "https://arxiv.org/abs/2301.00001"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("plan_initial"), "got {detail}");
    assert!(detail.contains("PodcastPlan"), "got {detail}");
}

#[tokio::test]
async fn model_timeout_is_504() {
    let base = spawn_app(Arc::new(SlowModel), Duration::from_millis(100)).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/create-podcast"))
        .json(&json!({"url": "https://arxiv.org/abs/2301.00001"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 504);
}
