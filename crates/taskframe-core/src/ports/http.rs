//! HttpTransport port - リモート task 実行の HTTP 層
//!
//! request の組み立て（URL / header / credential mode）は app 層で行い、
//! ここでは「送って status と body を返す」だけを抽象化します。
//! テストでは記録用の fake を差し込みます。

use async_trait::async_trait;
use thiserror::Error;

/// How ambient credentials (cookies) travel with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialsMode {
    /// Token-authenticated: ambient cookies are not forwarded cross-origin.
    SameOrigin,
    /// Cookie fallback for same-site deployments.
    Include,
}

impl CredentialsMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialsMode::SameOrigin => "same-origin",
            CredentialsMode::Include => "include",
        }
    }
}

/// A fully prepared `POST` with a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub credentials: CredentialsMode,
    pub body: serde_json::Value,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HttpFailure {
    /// No response was obtained (DNS, connect, TLS, ...).
    #[error("{0}")]
    Network(String),

    /// A status arrived but the body could not be read.
    #[error("failed to read body of HTTP {status} response: {message}")]
    UnreadableBody { status: u16, message: String },
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpFailure>;
}
