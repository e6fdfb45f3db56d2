//! HTTP provider tests against a mock model host.

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use riskscope_common::{Config, ProviderMode, ProvidersConfig};
use riskscope_engine::providers::HttpSignalProvider;
use riskscope_engine::{
    AnalysisJob, AssessmentService, ContentKind, JobRequest, NoHistory, ProviderContext,
    ProviderError, ProviderOutput, SharedTrendFeed, SignalKind, SignalProvider, SignalStatus,
    TrendFeed,
};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn providers_config(endpoint: &str) -> ProvidersConfig {
    ProvidersConfig {
        mode: ProviderMode::Http,
        endpoint: Some(endpoint.to_string()),
        timeout_secs: 5,
        max_retries: 2,
        retry_backoff_ms: 10,
    }
}

fn context() -> ProviderContext {
    ProviderContext {
        job_id: Uuid::new_v4(),
        content_kind: ContentKind::Text,
        platforms: vec![],
        audience: None,
    }
}

fn sentiment_body() -> serde_json::Value {
    json!({
        "label": "negative",
        "intensity": 0.6,
        "negative_weight": 0.9,
        "flagged_terms": [{ "start": 0, "end": 5 }]
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Single Provider
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_successful_call_decodes_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze/sentiment"))
        .and(body_partial_json(json!({ "content": "awful news" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(sentiment_body()))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        HttpSignalProvider::new(SignalKind::Sentiment, &server.uri(), &providers_config(&server.uri()))
            .unwrap();
    let output = provider.analyze("awful news", &context()).await.unwrap();

    let ProviderOutput::Sentiment(raw) = output else {
        panic!("expected sentiment output");
    };
    assert_eq!(raw.label, "negative");
    assert_eq!(raw.flagged_terms.len(), 1);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze/sentiment"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze/sentiment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sentiment_body()))
        .mount(&server)
        .await;

    let provider =
        HttpSignalProvider::new(SignalKind::Sentiment, &server.uri(), &providers_config(&server.uri()))
            .unwrap();
    let output = provider.analyze("awful news", &context()).await;

    assert!(output.is_ok());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze/trend"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad input"))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        HttpSignalProvider::new(SignalKind::Trend, &server.uri(), &providers_config(&server.uri()))
            .unwrap();
    let err = provider.analyze("anything", &context()).await.unwrap_err();

    match err {
        ProviderError::Http { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad input");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze/controversy"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let provider = HttpSignalProvider::new(
        SignalKind::Controversy,
        &server.uri(),
        &providers_config(&server.uri()),
    )
    .unwrap();
    let err = provider.analyze("anything", &context()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze/audience"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        HttpSignalProvider::new(SignalKind::Audience, &server.uri(), &providers_config(&server.uri()))
            .unwrap();
    let err = provider.analyze("anything", &context()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Malformed(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Full Pipeline
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pipeline_over_http_with_one_failing_signal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze/sentiment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sentiment_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze/controversy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dimensions": {
                "political": { "score": 0.8, "triggers": [{ "start": 6, "end": 10 }] }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze/trend"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unsupported"))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.providers = providers_config(&server.uri());
    let service = AssessmentService::from_config(
        &config,
        Arc::new(SharedTrendFeed::default()) as Arc<dyn TrendFeed>,
        Arc::new(NoHistory),
    )
    .unwrap();

    let job = AnalysisJob::from_request(JobRequest::text("Awful news again")).unwrap();
    let result = service.submit_for_analysis(job).await.unwrap();

    let trend = result.signals.get(SignalKind::Trend).unwrap();
    assert_eq!(trend.status, SignalStatus::Failed);
    assert!(trend.error.as_deref().unwrap_or_default().contains("422"));

    // Audience falls back to the baseline without calling the host
    assert!(result.signals.audience().unwrap().baseline);

    assert_eq!(result.assessment.unavailable_signals, vec![SignalKind::Trend]);
    assert_eq!(result.assessment.confidence_level, 85.0);
    // 0.25 * 100*0.6*0.95 + 0.35 * 80
    assert_eq!(result.assessment.risk_score, 42.25);
}
