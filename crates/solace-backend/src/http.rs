use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use solace_core::analysis::AnalysisPayload;
use solace_core::backend::{Backend, SubmitOutcome, TaskState};
use solace_core::context::ConversationContext;
use solace_core::errors::BackendError;
use solace_core::ids::TaskId;

const SUBMIT_PATH: &str = "/chat/messages";
const TASK_PATH: &str = "/chat/tasks";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the companion-service HTTP client.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787".into(),
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

/// HTTP implementation of the backend capability. Routes are a config
/// detail; the companion service decides per-message whether to answer
/// inline or hand back a task handle.
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(config.connect_timeout)
                .timeout(config.request_timeout)
                .build()
                .expect("failed to build HTTP client"),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(BackendConfig::default())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_request_error(e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(REQUEST_TIMEOUT)
        } else {
            BackendError::NetworkError(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    message: &'a str,
    context: &'a ConversationContext,
}

/// The submission response is either a deferred handle or an inline
/// payload. Tried in order: a bare `task_id` object first, since a
/// payload always carries `reply_text`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SubmitWire {
    Deferred { task_id: String },
    Inline(AnalysisPayload),
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum TaskWire {
    Processing,
    Completed {
        result: AnalysisPayload,
    },
    Error {
        #[serde(default)]
        error: String,
    },
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, user_text, context))]
    async fn submit(
        &self,
        user_text: &str,
        context: &ConversationContext,
    ) -> Result<SubmitOutcome, BackendError> {
        let body = SubmitRequest {
            message: user_text,
            context,
        };

        let resp = self
            .client
            .post(self.url(SUBMIT_PATH))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            // A 404 here is a misconfigured route, not a missing task.
            if status == 404 {
                return Err(BackendError::InvalidRequest(format!(
                    "submit route not found: {body}"
                )));
            }
            return Err(BackendError::from_status(status, body));
        }

        let wire: SubmitWire = resp
            .json()
            .await
            .map_err(|e| BackendError::InvalidRequest(format!("malformed submit response: {e}")))?;

        Ok(match wire {
            SubmitWire::Deferred { task_id } => SubmitOutcome::Deferred {
                task_id: TaskId::from_raw(task_id),
            },
            SubmitWire::Inline(payload) => SubmitOutcome::Immediate(payload),
        })
    }

    #[instrument(skip(self), fields(task_id = %task_id))]
    async fn query_task(&self, task_id: &TaskId) -> Result<TaskState, BackendError> {
        let resp = self
            .client
            .get(format!("{}/{}", self.url(TASK_PATH), task_id))
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = resp.status().as_u16();
        if status == 404 {
            return Err(BackendError::TaskNotFound(task_id.to_string()));
        }
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status, body));
        }

        let wire: TaskWire = resp
            .json()
            .await
            .map_err(|e| BackendError::InvalidRequest(format!("malformed task response: {e}")))?;

        Ok(match wire {
            TaskWire::Processing => TaskState::Processing,
            TaskWire::Completed { result } => TaskState::Completed(result),
            TaskWire::Error { error } => TaskState::Errored { message: error },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8787");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn url_joining_handles_trailing_slash() {
        let backend = HttpBackend::new(BackendConfig {
            base_url: "http://host:9000/".into(),
            ..Default::default()
        });
        assert_eq!(backend.url(SUBMIT_PATH), "http://host:9000/chat/messages");

        let backend = HttpBackend::new(BackendConfig {
            base_url: "http://host:9000".into(),
            ..Default::default()
        });
        assert_eq!(backend.url(TASK_PATH), "http://host:9000/chat/tasks");
    }

    #[test]
    fn submit_wire_deferred() {
        let wire: SubmitWire = serde_json::from_str(r#"{"task_id":"srv-task-17"}"#).unwrap();
        assert!(matches!(wire, SubmitWire::Deferred { ref task_id } if task_id == "srv-task-17"));
    }

    #[test]
    fn submit_wire_inline() {
        let wire: SubmitWire =
            serde_json::from_str(r#"{"reply_text":"I'm here with you."}"#).unwrap();
        match wire {
            SubmitWire::Inline(payload) => assert_eq!(payload.reply_text, "I'm here with you."),
            SubmitWire::Deferred { .. } => panic!("expected inline payload"),
        }
    }

    #[test]
    fn task_wire_processing() {
        let wire: TaskWire = serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        assert!(matches!(wire, TaskWire::Processing));
    }

    #[test]
    fn task_wire_completed() {
        let json = r#"{"status":"completed","result":{"reply_text":"All done."}}"#;
        let wire: TaskWire = serde_json::from_str(json).unwrap();
        match wire {
            TaskWire::Completed { result } => assert_eq!(result.reply_text, "All done."),
            _ => panic!("expected completed"),
        }
    }

    #[test]
    fn task_wire_error_with_and_without_detail() {
        let wire: TaskWire =
            serde_json::from_str(r#"{"status":"error","error":"model overloaded"}"#).unwrap();
        assert!(matches!(wire, TaskWire::Error { ref error } if error == "model overloaded"));

        let wire: TaskWire = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert!(matches!(wire, TaskWire::Error { ref error } if error.is_empty()));
    }

    #[test]
    fn submit_request_serializes_context() {
        let ctx = ConversationContext::empty();
        let req = SubmitRequest {
            message: "hello",
            context: &ctx,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["message"], "hello");
        assert!(json["context"]["turns"].as_array().unwrap().is_empty());
    }
}
