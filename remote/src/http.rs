// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with proxy, session token and status mapping.

use reqwest::{Client, Method, Proxy, RequestBuilder, Response, StatusCode};

use crate::config::RemoteConfig;
use crate::error::RemoteError;

/// Header carrying the pooled session token.
pub const TOKEN_HEADER: &str = "X-Session-Token";

/// HTTP client for remote store operations.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails, including a bad proxy
    /// address.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let mut builder = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent);
        if let Some(host) = &config.proxy_host {
            let port = config.proxy_port.unwrap_or(8080);
            builder = builder.proxy(Proxy::all(format!("http://{host}:{port}"))?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Builds a request, attaching the session token when one is given.
    pub fn build_request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(token) = token {
            req = req.header(TOKEN_HEADER, token);
        }
        req
    }

    /// Executes a request and maps error statuses to [`RemoteError`].
    ///
    /// # Errors
    ///
    /// 401/403 become [`RemoteError::InvalidCredentials`]; other 4xx carry
    /// the body as [`RemoteError::Rejected`]; 5xx become
    /// [`RemoteError::Status`].
    pub async fn execute(&self, req: RequestBuilder) -> Result<Response, RemoteError> {
        let resp = req.send().await?;

        match resp.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(resp),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                RemoteError::InvalidCredentials(resp.url().to_string()),
            ),
            status if status.is_client_error() => {
                let body = read_body(resp).await;
                Err(RemoteError::Rejected(body))
            }
            status => {
                let body = read_body(resp).await;
                Err(RemoteError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

async fn read_body(resp: Response) -> String {
    resp.text()
        .await
        .unwrap_or_else(|_| "Unable to read response".to_string())
}
