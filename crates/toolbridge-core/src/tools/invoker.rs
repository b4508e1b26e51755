//! Tool invocation against the provider connection

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;

use crate::logging::Logger;
use crate::provider::ProviderError;
use crate::types::{ToolInvocationRequest, ToolInvocationResult};
use super::catalog::ToolCatalog;

/// Invocation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvokeError {
    /// Name absent from the filtered catalog; never forwarded to the provider
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Connection lost or call timed out
    #[error("Tool provider unavailable: {0}")]
    ProviderUnavailable(String),
}

pub type InvokeResult<T> = Result<T, InvokeError>;

/// Executes tool requests and normalizes their output
pub struct ToolInvoker {
    catalog: Arc<ToolCatalog>,
    timeout: Option<Duration>,
    concurrent: bool,
    logger: Arc<dyn Logger>,
}

impl ToolInvoker {
    pub fn new(catalog: Arc<ToolCatalog>, logger: Arc<dyn Logger>) -> Self {
        Self {
            catalog,
            timeout: None,
            concurrent: false,
            logger,
        }
    }

    /// Per-call timeout; an expired call counts as a provider failure
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow batches to run concurrently when the provider supports it
    pub fn with_concurrency(mut self, enabled: bool) -> Self {
        self.concurrent = enabled;
        self
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Invoke one tool
    ///
    /// Provider-reported failures come back as `ok == false` results. Only
    /// unknown names and a lost connection are errors.
    pub async fn invoke(&self, request: &ToolInvocationRequest) -> InvokeResult<ToolInvocationResult> {
        if self.catalog.lookup(&request.tool_name).is_none() {
            self.logger.warn(&format!(
                "[ToolInvoker] Model requested unknown tool '{}'",
                request.tool_name
            ));
            return Err(InvokeError::UnknownTool(request.tool_name.clone()));
        }

        self.logger.debug(&format!(
            "[ToolInvoker] Calling {} ({})",
            request.tool_name, request.call_id
        ));

        let provider = self.catalog.provider();
        let call = provider.call_tool(&request.tool_name, request.arguments.clone());
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.logger.error(&format!(
                        "[ToolInvoker] {} timed out after {:?}",
                        request.tool_name, limit
                    ));
                    return Err(InvokeError::ProviderUnavailable(format!(
                        "call to '{}' timed out after {:?}",
                        request.tool_name, limit
                    )));
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(output) => {
                let content = output.render_text();
                let mut result = if output.is_error {
                    ToolInvocationResult::failure(&request.call_id, &request.tool_name, content)
                } else {
                    ToolInvocationResult::success(&request.call_id, &request.tool_name, content)
                };
                if let Some(structured) = output.structured {
                    result = result.with_structured(structured);
                }
                Ok(result)
            }
            Err(ProviderError::ToolFailed(message)) => {
                self.logger.info(&format!(
                    "[ToolInvoker] {} failed: {}",
                    request.tool_name, message
                ));
                Ok(ToolInvocationResult::failure(
                    &request.call_id,
                    &request.tool_name,
                    format!("Error: {}", message),
                ))
            }
            Err(ProviderError::Unavailable(message)) => {
                self.logger.error(&format!(
                    "[ToolInvoker] Provider lost during {}: {}",
                    request.tool_name, message
                ));
                Err(InvokeError::ProviderUnavailable(message))
            }
        }
    }

    /// Invoke a batch, returning one result per request in request order
    ///
    /// Unknown tools become failed results so the model can recover. The
    /// batch stops at the first `ProviderUnavailable`.
    pub async fn invoke_batch(
        &self,
        requests: &[ToolInvocationRequest],
    ) -> InvokeResult<Vec<ToolInvocationResult>> {
        if self.concurrent && requests.len() > 1 && self.catalog.provider().supports_concurrent_calls() {
            let outcomes = join_all(requests.iter().map(|request| self.invoke(request))).await;
            return requests
                .iter()
                .zip(outcomes)
                .map(|(request, outcome)| self.recover(request, outcome))
                .collect();
        }

        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let outcome = self.invoke(request).await;
            results.push(self.recover(request, outcome)?);
        }
        Ok(results)
    }

    fn recover(
        &self,
        request: &ToolInvocationRequest,
        outcome: InvokeResult<ToolInvocationResult>,
    ) -> InvokeResult<ToolInvocationResult> {
        match outcome {
            Err(InvokeError::UnknownTool(name)) => {
                let available = self.catalog.declarations().names().join(", ");
                Ok(ToolInvocationResult::failure(
                    &request.call_id,
                    &request.tool_name,
                    format!("Error: unknown tool '{}'. Available tools: {}", name, available),
                ))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::provider::{MockBehavior, MockToolProvider};
    use crate::schema::{GeminiSchemaAdapter, OpenAiSchemaAdapter};
    use crate::types::{Tool, ToolArguments};
    use serde_json::json;

    fn args(value: serde_json::Value) -> ToolArguments {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn invoker_for(provider: MockToolProvider) -> (ToolInvoker, Arc<MockToolProvider>) {
        let provider = Arc::new(provider);
        let catalog = Arc::new(ToolCatalog::new(
            provider.clone(),
            Box::new(OpenAiSchemaAdapter::new()),
            Arc::new(NoOpLogger::new()),
        ));
        catalog.list_tools().await.unwrap();
        (ToolInvoker::new(catalog, Arc::new(NoOpLogger::new())), provider)
    }

    fn tools() -> Vec<Tool> {
        vec![Tool::new("get_alerts", "Alerts"), Tool::new("get_forecast", "Forecast")]
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let mock = MockToolProvider::new(tools(), Arc::new(NoOpLogger::new()))
            .with_behavior("get_alerts", MockBehavior::Reply("No active alerts".to_string()));
        let (invoker, provider) = invoker_for(mock).await;

        let request = ToolInvocationRequest::new("call_1", "get_alerts", args(json!({ "state": "CA" })));
        let result = invoker.invoke(&request).await.unwrap();

        assert!(result.ok);
        assert_eq!(result.call_id, "call_1");
        assert_eq!(result.content, "No active alerts");
        assert_eq!(provider.calls()[0].1.get("state"), Some(&json!("CA")));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_forwarded() {
        let (invoker, provider) =
            invoker_for(MockToolProvider::new(tools(), Arc::new(NoOpLogger::new()))).await;

        let request = ToolInvocationRequest::new("call_1", "launch_rockets", ToolArguments::new());
        assert_eq!(
            invoker.invoke(&request).await,
            Err(InvokeError::UnknownTool("launch_rockets".to_string()))
        );
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_untranslatable_tool_is_reported_unknown() {
        let mut all = tools();
        all.push(Tool::new("combine", "Uses allOf").with_schema(json!({
            "type": "object",
            "allOf": [ { "required": ["a"] } ]
        })));
        let provider = Arc::new(MockToolProvider::new(all, Arc::new(NoOpLogger::new())));
        let catalog = Arc::new(ToolCatalog::new(
            provider.clone(),
            Box::new(GeminiSchemaAdapter::new()),
            Arc::new(NoOpLogger::new()),
        ));
        catalog.list_tools().await.unwrap();
        let invoker = ToolInvoker::new(catalog, Arc::new(NoOpLogger::new()));

        let request = ToolInvocationRequest::new("call_1", "combine", ToolArguments::new());
        let results = invoker.invoke_batch(&[request]).await.unwrap();

        assert!(!results[0].ok);
        assert!(results[0].content.contains("unknown tool 'combine'"));
        assert!(results[0].content.ends_with("Available tools: get_alerts, get_forecast"));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tool_errors_become_failed_results() {
        let mock = MockToolProvider::new(tools(), Arc::new(NoOpLogger::new()))
            .with_behavior("get_alerts", MockBehavior::ErrorResult("bad state".to_string()))
            .with_behavior("get_forecast", MockBehavior::Fail("upstream 503".to_string()));
        let (invoker, _) = invoker_for(mock).await;

        let alerts = invoker
            .invoke(&ToolInvocationRequest::new("a", "get_alerts", ToolArguments::new()))
            .await
            .unwrap();
        assert!(!alerts.ok);
        assert_eq!(alerts.content, "bad state");

        let forecast = invoker
            .invoke(&ToolInvocationRequest::new("b", "get_forecast", ToolArguments::new()))
            .await
            .unwrap();
        assert!(!forecast.ok);
        assert!(forecast.content.contains("upstream 503"));
    }

    #[tokio::test]
    async fn test_disconnect_is_provider_unavailable() {
        let mock = MockToolProvider::new(tools(), Arc::new(NoOpLogger::new()))
            .with_behavior("get_alerts", MockBehavior::Disconnect);
        let (invoker, _) = invoker_for(mock).await;

        let err = invoker
            .invoke(&ToolInvocationRequest::new("a", "get_alerts", ToolArguments::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::ProviderUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_provider_unavailable() {
        let mock = MockToolProvider::new(tools(), Arc::new(NoOpLogger::new())).with_behavior(
            "get_alerts",
            MockBehavior::Delayed(
                Duration::from_secs(30),
                Box::new(MockBehavior::Reply("late".to_string())),
            ),
        );
        let (invoker, _) = invoker_for(mock).await;
        let invoker = invoker.with_timeout(Some(Duration::from_secs(5)));

        let err = invoker
            .invoke(&ToolInvocationRequest::new("a", "get_alerts", ToolArguments::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_batch_keeps_request_order_and_recovers_unknown() {
        let mock = MockToolProvider::new(tools(), Arc::new(NoOpLogger::new()))
            .with_behavior("get_alerts", MockBehavior::Fail("boom".to_string()));
        let (invoker, _) = invoker_for(mock).await;

        let requests = vec![
            ToolInvocationRequest::new("1", "get_forecast", ToolArguments::new()),
            ToolInvocationRequest::new("2", "nope", ToolArguments::new()),
            ToolInvocationRequest::new("3", "get_alerts", ToolArguments::new()),
        ];
        let results = invoker.invoke_batch(&requests).await.unwrap();

        let ids: Vec<_> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(results[0].ok);
        assert!(!results[1].ok);
        assert!(results[1].content.contains("unknown tool 'nope'"));
        assert!(!results[2].ok);
    }

    #[tokio::test]
    async fn test_sequential_batch_stops_at_disconnect() {
        let mock = MockToolProvider::new(tools(), Arc::new(NoOpLogger::new()))
            .with_behavior("get_alerts", MockBehavior::Disconnect);
        let (invoker, provider) = invoker_for(mock).await;

        let requests = vec![
            ToolInvocationRequest::new("1", "get_alerts", ToolArguments::new()),
            ToolInvocationRequest::new("2", "get_forecast", ToolArguments::new()),
        ];
        assert!(invoker.invoke_batch(&requests).await.is_err());
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_batch_reassembles_in_request_order() {
        let mock = MockToolProvider::new(tools(), Arc::new(NoOpLogger::new()))
            .with_concurrency()
            .with_behavior(
                "get_alerts",
                MockBehavior::Delayed(
                    Duration::from_millis(50),
                    Box::new(MockBehavior::Reply("slow".to_string())),
                ),
            )
            .with_behavior("get_forecast", MockBehavior::Reply("fast".to_string()));
        let (invoker, _) = invoker_for(mock).await;
        let invoker = invoker.with_concurrency(true);

        let requests = vec![
            ToolInvocationRequest::new("1", "get_alerts", ToolArguments::new()),
            ToolInvocationRequest::new("2", "get_forecast", ToolArguments::new()),
        ];
        let results = invoker.invoke_batch(&requests).await.unwrap();

        assert_eq!(results[0].content, "slow");
        assert_eq!(results[1].content, "fast");
    }
}
