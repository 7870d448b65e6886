//! reqwest-backed campus API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use tokio::time::Instant;

use crate::config::SchedulerConfig;
use crate::core::{
    AccessToken, ApiResponse, ClientCredential, OutboundRequest, SchedulerError, Upstream,
};

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl TokenResponse {
    fn into_token(self, received_at: Instant) -> AccessToken {
        match self.expires_in {
            Some(secs) => {
                AccessToken::expiring(self.access_token, received_at + Duration::from_secs(secs))
            }
            None => AccessToken::new(self.access_token),
        }
    }
}

/// HTTP implementation of [`Upstream`].
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    api_root: String,
    token_url: String,
}

impl HttpUpstream {
    /// Build a client for the endpoints in `cfg`.
    pub fn new(cfg: &SchedulerConfig) -> Result<Self, SchedulerError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = cfg.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SchedulerError::Config(format!("http client: {e}")))?;
        Ok(Self::with_client(client, cfg))
    }

    /// Use an existing reqwest client.
    pub fn with_client(client: reqwest::Client, cfg: &SchedulerConfig) -> Self {
        Self {
            client,
            api_root: cfg.api_root(),
            token_url: cfg.token_url(),
        }
    }

    /// Absolute URL for a path under the API prefix.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn exchange_token(
        &self,
        credential: &ClientCredential,
    ) -> Result<AccessToken, SchedulerError> {
        let index = credential.index;
        let fail = |reason: String| SchedulerError::TokenExchange { index, reason };

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credential.client_id.as_str()),
                ("client_secret", credential.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("token endpoint returned {status}")));
        }

        let received_at = Instant::now();
        let body: TokenResponse = response.json().await.map_err(|e| fail(e.to_string()))?;
        Ok(body.into_token(received_at))
    }

    async fn send(
        &self,
        request: &OutboundRequest,
        token: &AccessToken,
    ) -> Result<ApiResponse, SchedulerError> {
        let options = &request.options;
        let mut headers = options.headers.clone();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.secret()))
            .map_err(|e| SchedulerError::Transport(format!("invalid token header: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);

        let mut builder = self
            .client
            .request(options.method.clone(), self.url_for(request.path()))
            .headers(headers);
        if let Some(body) = &options.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        Ok(ApiResponse::new(status, headers, body.to_vec()))
    }
}
