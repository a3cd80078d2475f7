//! TaskApiClient - 別の task をリモート実行する
//!
//! # フロー
//! 1. base URL 解決（明示 override > hostname による dev / prod 判定）
//! 2. credential の選択
//!    - token あり: `Authorization: Bearer` + `CredentialsMode::SameOrigin`
//!    - token なし: `CredentialsMode::Include`（same-site 向けの cookie fallback）
//! 3. `POST {base}/execute_task` を 1 回だけ送る（retry なし）
//! 4. 結果を `Result<T, ExecutionError>` に正規化
//!
//! DESTROY を受けても in-flight の request は中断しません。

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::domain::errors::INVALID_RESPONSE;
use crate::domain::{ExecutionContext, ExecutionError, TaskUuid};
use crate::ports::{CredentialsMode, HttpFailure, HttpRequest, HttpTransport};

pub const EXECUTE_TASK_PATH: &str = "/execute_task";
pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";

/// Hostnames that select the development base URL.
pub const LOOPBACK_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Pick the API base URL. An explicit override always wins.
pub fn resolve_base_url(override_url: Option<&str>, hostname: &str, api: &ApiConfig) -> String {
    if let Some(url) = override_url.or(api.base_url_override.as_deref()) {
        return url.to_string();
    }
    if LOOPBACK_HOSTS.contains(&hostname) {
        api.development_base_url.clone()
    } else {
        api.production_base_url.clone()
    }
}

/// Hostname part of an origin such as `http://localhost:5173`.
pub fn hostname_of(origin: &str) -> Option<String> {
    reqwest::Url::parse(origin)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
}

/// Credentials and routing for one or more invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub api_token: Option<String>,
    pub conversation_id: Option<String>,
    pub api_base_url: Option<String>,
}

impl InvocationContext {
    pub fn from_execution_context(context: &ExecutionContext) -> Self {
        Self {
            api_token: context.api_token.clone(),
            conversation_id: context.conversation_id.clone(),
            api_base_url: context.api_base_url.clone(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn credentials_mode(&self) -> CredentialsMode {
        if self.api_token.is_some() {
            CredentialsMode::SameOrigin
        } else {
            CredentialsMode::Include
        }
    }
}

#[derive(Clone)]
pub struct TaskApiClient {
    transport: Arc<dyn HttpTransport>,
    api: ApiConfig,
    hostname: String,
}

impl TaskApiClient {
    /// `hostname` is the host the task is served from; it only matters when
    /// no base URL override is configured.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api: ApiConfig,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api,
            hostname: hostname.into(),
        }
    }

    /// Same as [`TaskApiClient::new`], reading the hostname from the task
    /// frame's origin (e.g. `TaskTransport::origin()`).
    pub fn for_origin(transport: Arc<dyn HttpTransport>, api: ApiConfig, origin: &str) -> Self {
        let hostname = hostname_of(origin).unwrap_or_else(|| {
            tracing::debug!(origin, "origin has no hostname; assuming production");
            String::new()
        });
        Self::new(transport, api, hostname)
    }

    pub fn base_url(&self, context: &InvocationContext) -> String {
        resolve_base_url(context.api_base_url.as_deref(), &self.hostname, &self.api)
    }

    pub fn prepare(
        &self,
        task_id: &TaskUuid,
        inputs: &Value,
        context: &InvocationContext,
    ) -> HttpRequest {
        let url = format!(
            "{}{}",
            self.base_url(context).trim_end_matches('/'),
            EXECUTE_TASK_PATH
        );

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = &context.api_token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        if let Some(conversation_id) = &context.conversation_id {
            headers.push((CONVERSATION_ID_HEADER.to_string(), conversation_id.clone()));
        }

        let body = serde_json::json!({
            "task_uuid": task_id.as_str(),
            "inputs": inputs,
        });

        HttpRequest {
            url,
            headers,
            credentials: context.credentials_mode(),
            body,
        }
    }

    /// Execute `task_id` once. Every failure comes back as `ExecutionError`.
    pub async fn execute_task<T: DeserializeOwned>(
        &self,
        task_id: &TaskUuid,
        inputs: Value,
        context: &InvocationContext,
    ) -> Result<T, ExecutionError> {
        let request = self.prepare(task_id, &inputs, context);
        tracing::debug!(
            %task_id,
            url = %request.url,
            credentials = request.credentials.as_str(),
            "executing remote task"
        );

        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!(%task_id, error = %e, "remote task request failed");
            normalize_failure(e)
        })?;

        if !response.is_success() {
            let err = ExecutionError::from_http_failure(response.status, &response.body);
            tracing::warn!(
                %task_id,
                status = response.status,
                code = %err.code,
                "remote task failed"
            );
            return Err(err);
        }

        let body = if response.body.trim().is_empty() {
            "null"
        } else {
            response.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| {
            ExecutionError::new(INVALID_RESPONSE, e.to_string())
                .with_details(Value::String(response.body.clone()))
        })
    }

    /// Close over `context` so call sites only pass task id and inputs.
    pub fn bind(&self, context: InvocationContext) -> BoundInvoker {
        BoundInvoker {
            client: self.clone(),
            context,
        }
    }
}

/// A client pre-bound to one credential / conversation / base-URL triple.
#[derive(Clone)]
pub struct BoundInvoker {
    client: TaskApiClient,
    context: InvocationContext,
}

impl BoundInvoker {
    pub fn context(&self) -> &InvocationContext {
        &self.context
    }

    pub async fn execute<T: DeserializeOwned>(
        &self,
        task_id: &TaskUuid,
        inputs: Value,
    ) -> Result<T, ExecutionError> {
        self.client.execute_task(task_id, inputs, &self.context).await
    }
}

/// Only a missing response is a network error. A response whose body could
/// not be read keeps its HTTP status.
fn normalize_failure(failure: HttpFailure) -> ExecutionError {
    match failure {
        HttpFailure::Network(description) => ExecutionError::network(description),
        HttpFailure::UnreadableBody { status, message } if (200..300).contains(&status) => {
            ExecutionError::new(INVALID_RESPONSE, message)
                .with_details(serde_json::json!({ "status": status }))
        }
        HttpFailure::UnreadableBody { status, .. } => ExecutionError::from_http_failure(status, ""),
    }
}

/// `{ success, output | error }` view of an invocation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
}

impl From<Result<Value, ExecutionError>> for ExecutionReport {
    fn from(result: Result<Value, ExecutionError>) -> Self {
        match result {
            Ok(output) => Self {
                success: true,
                output: Some(output),
                error: None,
            },
            Err(error) => Self {
                success: false,
                output: None,
                error: Some(error),
            },
        }
    }
}
