//! ReqwestTransport - reqwest による HttpTransport 実装
//!
//! ブラウザの cookie jar は存在しないので、ambient cookie は
//! 設定済みの `Cookie` header として持ち、`CredentialsMode::Include` のときだけ付与します。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::COOKIE;

use crate::ports::{CredentialsMode, HttpFailure, HttpRequest, HttpResponse, HttpTransport};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub struct ReqwestTransport {
    client: Client,
    ambient_cookies: Option<String>,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            ambient_cookies: None,
        }
    }

    /// Cookie header forwarded in `Include` mode.
    pub fn with_ambient_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.ambient_cookies = Some(cookies.into());
        self
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpFailure> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.credentials == CredentialsMode::Include
            && let Some(cookies) = &self.ambient_cookies
        {
            builder = builder.header(COOKIE, cookies.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpFailure::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| HttpFailure::UnreadableBody {
                status,
                message: e.to_string(),
            })?;

        Ok(HttpResponse { status, body })
    }
}
