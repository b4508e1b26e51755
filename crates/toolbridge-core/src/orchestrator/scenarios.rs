use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::backends::{AssistantReply, BackendError, ScriptStep, ScriptedBackend};
use crate::logging::NoOpLogger;
use crate::provider::{MockBehavior, MockToolProvider, ToolProvider};
use crate::schema::OpenAiSchemaAdapter;
use crate::tools::{ToolCatalog, ToolInvoker};
use crate::types::{Tool, ToolArguments, ToolInvocationRequest, Turn};

fn weather_tools() -> Vec<Tool> {
    vec![
        Tool::new("get_alerts", "Get weather alerts for a US state").with_schema(json!({
            "type": "object",
            "properties": { "state": { "type": "string" } },
            "required": ["state"]
        })),
        Tool::new("get_forecast", "Get weather forecast for a location").with_schema(json!({
            "type": "object",
            "properties": {
                "latitude": { "type": "number" },
                "longitude": { "type": "number" }
            },
            "required": ["latitude", "longitude"]
        })),
    ]
}

fn args(value: serde_json::Value) -> ToolArguments {
    value.as_object().cloned().unwrap_or_default()
}

struct Harness {
    provider: Arc<MockToolProvider>,
    backend: Arc<ScriptedBackend>,
    orchestrator: OrchestrationLoop,
}

async fn harness(provider: MockToolProvider, backend: ScriptedBackend, config: LoopConfig) -> Harness {
    let logger = Arc::new(NoOpLogger::new());
    let provider = Arc::new(provider);
    let backend = Arc::new(backend);
    let catalog = Arc::new(ToolCatalog::new(
        provider.clone(),
        Box::new(OpenAiSchemaAdapter::new()),
        logger.clone(),
    ));
    catalog.list_tools().await.unwrap();
    let invoker = ToolInvoker::new(catalog, logger.clone());

    Harness {
        provider,
        backend: backend.clone(),
        orchestrator: OrchestrationLoop::new(backend, invoker, config, logger),
    }
}

fn mock_provider() -> MockToolProvider {
    MockToolProvider::new(weather_tools(), Arc::new(NoOpLogger::new()))
}

fn script() -> ScriptedBackend {
    ScriptedBackend::new(Arc::new(NoOpLogger::new()))
}

#[tokio::test]
async fn test_zero_tool_requests_is_one_round() {
    let mut h = harness(mock_provider(), script().then_text("Hello there."), LoopConfig::default()).await;

    let exchange = h.orchestrator.submit("hi").await.unwrap();

    assert_eq!(exchange.text, "Hello there.");
    assert_eq!(exchange.rounds, 1);
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(h.orchestrator.state(), LoopState::AwaitingUserInput);
    assert_eq!(
        h.orchestrator.conversation().turns(),
        &[Turn::user("hi"), Turn::assistant("Hello there.", vec![])]
    );
}

#[tokio::test]
async fn test_n_results_in_request_order_before_next_round() {
    let requests = vec![
        ToolInvocationRequest::new("c1", "get_forecast", args(json!({ "latitude": 1, "longitude": 2 }))),
        ToolInvocationRequest::new("c2", "get_alerts", args(json!({ "state": "CA" }))),
        ToolInvocationRequest::new("c3", "get_alerts", args(json!({ "state": "NY" }))),
    ];
    let backend = script()
        .then(ScriptStep::Reply(AssistantReply::with_tool_calls("", requests)))
        .then_text("Done.");
    let mut h = harness(mock_provider(), backend, LoopConfig::default()).await;

    h.orchestrator.submit("weather please").await.unwrap();

    let requests = h.backend.requests();
    let second = &requests[1].transcript;
    assert_eq!(second.len(), 5);
    let result_ids: Vec<_> = second[2..]
        .iter()
        .map(|turn| match turn {
            Turn::ToolResult { call_id, .. } => call_id.as_str(),
            other => panic!("expected tool result, got {:?}", other),
        })
        .collect();
    assert_eq!(result_ids, vec!["c1", "c2", "c3"]);
    assert_eq!(h.provider.calls().len(), 3);
}

#[tokio::test]
async fn test_scenario_a_weather_alerts() {
    let provider = mock_provider().with_behavior(
        "get_alerts",
        MockBehavior::Reply("Event: Heat Advisory\nArea: Sacramento Valley".to_string()),
    );
    let backend = script()
        .then_tool_call("", "call_1", "get_alerts", args(json!({ "state": "CA" })))
        .then_text("There is a heat advisory for the Sacramento Valley.");
    let mut h = harness(provider, backend, LoopConfig::default()).await;

    let exchange = h.orchestrator.submit("What are the weather alerts in California?").await.unwrap();

    assert_eq!(exchange.text, "There is a heat advisory for the Sacramento Valley.");
    assert_eq!(exchange.rounds, 2);
    assert_eq!(exchange.tool_activity.len(), 1);
    assert!(exchange.tool_activity[0].result.ok);
    assert_eq!(h.provider.calls()[0].0, "get_alerts");
    assert_eq!(h.backend.requests()[0].tools, vec!["get_alerts", "get_forecast"]);
}

#[tokio::test]
async fn test_scenario_b_provider_disconnects_mid_invocation() {
    let provider = mock_provider().with_behavior("get_alerts", MockBehavior::Disconnect);
    let backend = script()
        .then_tool_call("", "call_1", "get_alerts", args(json!({ "state": "CA" })))
        .then_text("never sent");
    let mut h = harness(provider, backend, LoopConfig::default()).await;

    let err = h.orchestrator.submit("alerts?").await.unwrap_err();

    assert!(matches!(err, OrchestrationError::ProviderUnavailable(_)));
    assert!(err.is_session_fatal());
    assert_eq!(h.backend.call_count(), 1);
    assert!(h.orchestrator.is_closed());
    assert!(!h.provider.is_connected());
    assert!(matches!(
        h.orchestrator.submit("hello?").await,
        Err(OrchestrationError::Closed)
    ));
}

#[tokio::test]
async fn test_scenario_c_unknown_tool_recovers() {
    let backend = script()
        .then_tool_call("", "call_1", "get_tides", args(json!({ "port": "Boston" })))
        .then_text("I can't check tides, but I can get forecasts.");
    let mut h = harness(mock_provider(), backend, LoopConfig::default()).await;

    let exchange = h.orchestrator.submit("tides in Boston?").await.unwrap();

    assert_eq!(exchange.text, "I can't check tides, but I can get forecasts.");
    assert!(h.provider.calls().is_empty());
    let requests = h.backend.requests();
    let second = &requests[1].transcript;
    match second.last() {
        Some(Turn::ToolResult { ok, content, .. }) => {
            assert!(!ok);
            assert!(content.contains("unknown tool 'get_tides'"));
        }
        other => panic!("expected failed tool result, got {:?}", other),
    }
}

#[tokio::test]
async fn test_scenario_d_round_limit() {
    let mut backend = script();
    for i in 1..=10 {
        backend = backend.then_tool_call(
            format!("step {}", i),
            format!("call_{}", i),
            "get_alerts",
            args(json!({ "state": "CA" })),
        );
    }
    let config = LoopConfig {
        max_rounds: 5,
        ..LoopConfig::default()
    };
    let mut h = harness(mock_provider(), backend, config).await;

    let err = h.orchestrator.submit("loop forever").await.unwrap_err();

    match &err {
        OrchestrationError::MaxRoundsExceeded { rounds, text } => {
            assert_eq!(*rounds, 5);
            assert_eq!(text, "step 1\nstep 2\nstep 3\nstep 4\nstep 5");
        }
        other => panic!("expected MaxRoundsExceeded, got {:?}", other),
    }
    assert!(!err.is_session_fatal());
    assert_eq!(h.backend.call_count(), 5);
    assert_eq!(h.provider.calls().len(), 5);
    assert!(h.orchestrator.conversation().pending_results().is_empty());
}

#[tokio::test]
async fn test_backend_failure_keeps_loop_usable() {
    let backend = script()
        .then_fail(BackendError::api("mock", 503, "overloaded"))
        .then_text("Back online.");
    let mut h = harness(mock_provider(), backend, LoopConfig::default()).await;

    let err = h.orchestrator.submit("hi").await.unwrap_err();
    assert!(matches!(err, OrchestrationError::BackendUnavailable { .. }));
    assert!(!err.is_session_fatal());
    assert_eq!(h.orchestrator.state(), LoopState::AwaitingUserInput);

    let exchange = h.orchestrator.submit("hi again").await.unwrap();
    assert_eq!(exchange.text, "Back online.");
}

#[tokio::test]
async fn test_degraded_reply_returns_partial_text() {
    let backend = script()
        .then_tool_call("Checking the forecast.", "call_1", "get_forecast", ToolArguments::new())
        .then_fail(BackendError::Degraded {
            backend: "mock".to_string(),
            partial_text: "It looks sunny".to_string(),
            message: "bad tool call".to_string(),
        });
    let mut h = harness(mock_provider(), backend, LoopConfig::default()).await;

    let err = h.orchestrator.submit("forecast?").await.unwrap_err();

    assert!(err.is_degraded());
    assert_eq!(err.partial_text(), Some("Checking the forecast.\nIt looks sunny"));
}

#[tokio::test(start_paused = true)]
async fn test_backend_timeout() {
    let backend = script().then(ScriptStep::Delayed(
        Duration::from_secs(120),
        Box::new(ScriptStep::Reply(AssistantReply::text("too late"))),
    ));
    let config = LoopConfig {
        backend_timeout: Some(Duration::from_secs(10)),
        ..LoopConfig::default()
    };
    let mut h = harness(mock_provider(), backend, config).await;

    match h.orchestrator.submit("hi").await {
        Err(OrchestrationError::BackendUnavailable { source, .. }) => {
            assert!(matches!(source, BackendError::Timeout { .. }));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reused_call_ids_are_rekeyed() {
    let backend = script()
        .then_tool_call("", "call_0", "get_alerts", args(json!({ "state": "CA" })))
        .then_tool_call("", "call_0", "get_alerts", args(json!({ "state": "NY" })))
        .then_text("Both states are quiet.");
    let mut h = harness(mock_provider(), backend, LoopConfig::default()).await;

    let exchange = h.orchestrator.submit("CA and NY alerts").await.unwrap();

    let ids: Vec<_> = exchange
        .tool_activity
        .iter()
        .map(|a| a.result.call_id.clone())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_disabled_tool_is_not_declared() {
    let mut h = harness(mock_provider(), script().then_text("ok"), LoopConfig::default()).await;
    h.orchestrator.catalog().set_tool_enabled("get_forecast", false);

    h.orchestrator.submit("hi").await.unwrap();

    assert_eq!(h.backend.requests()[0].tools, vec!["get_alerts"]);
}

#[tokio::test]
async fn test_reset_clears_transcript() {
    let mut h = harness(mock_provider(), script(), LoopConfig::default()).await;
    h.orchestrator.submit("remember me").await.unwrap();
    assert_eq!(h.orchestrator.conversation().len(), 2);

    h.orchestrator.reset().unwrap();
    let exchange = h.orchestrator.submit("who am I?").await.unwrap();

    assert_eq!(exchange.text, "Echo: who am I?");
    assert_eq!(h.backend.requests()[1].transcript.len(), 1);
}
