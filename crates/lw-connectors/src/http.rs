//! HTTP client for connectors.
//!
//! Requests are sent exactly once. Authentication is attached per request,
//! and metadata-server tokens are cached until shortly before they expire.

use crate::secret::SecretToken;
use crate::traits::{AuthConfig, ConnectorConfig, ConnectorError, ConnectorResult};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Tokens are refreshed this long before their reported expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// HTTP client bound to one connector configuration.
pub struct HttpClient {
    client: Client,
    config: ConnectorConfig,
    /// Cached metadata-server token.
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: SecretToken,
    expires_at: Instant,
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl HttpClient {
    /// Creates a new HTTP client from connector configuration.
    pub fn new(config: ConnectorConfig) -> ConnectorResult<Self> {
        let verify_tls = if config.verify_tls {
            true
        } else if cfg!(debug_assertions) {
            warn!(
                base_url = %config.base_url,
                connector_name = %config.name,
                "TLS certificate verification DISABLED in development mode"
            );
            false
        } else {
            warn!(
                base_url = %config.base_url,
                connector_name = %config.name,
                "Ignoring request to disable TLS verification in a release build"
            );
            true
        };

        let mut headers = reqwest::header::HeaderMap::new();
        for (key, value) in &config.headers {
            if let (Ok(name), Ok(val)) = (
                reqwest::header::HeaderName::try_from(key.as_str()),
                reqwest::header::HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(name, val);
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!verify_tls)
            .pool_idle_timeout(Duration::from_secs(90))
            .default_headers(headers)
            .build()
            .map_err(|e| ConnectorError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            config,
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Builds a URL from a path.
    pub fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Executes a GET request.
    pub async fn get(&self, path: &str) -> ConnectorResult<Response> {
        let url = self.build_url(path);
        self.execute(self.client.get(&url)).await
    }

    /// Executes a GET request and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ConnectorResult<T> {
        let response = self.get(path).await?;
        parse_json_response(response).await
    }

    /// Executes a POST request with a JSON body.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> ConnectorResult<Response> {
        let url = self.build_url(path);
        self.execute(self.client.post(&url).json(body)).await
    }

    /// Executes a POST request and deserializes the JSON response.
    pub async fn post_json<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> ConnectorResult<R> {
        let response = self.post(path, body).await?;
        parse_json_response(response).await
    }

    /// Sends a request once with authentication and status mapping.
    async fn execute(&self, request: reqwest::RequestBuilder) -> ConnectorResult<Response> {
        let request = self.add_auth(request).await?;

        let response = request.send().await.map_err(map_send_error)?;
        let status = response.status();
        debug!(status = %status, url = %response.url(), "HTTP response received");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(500).collect();
        Err(match status {
            StatusCode::UNAUTHORIZED => ConnectorError::AuthenticationFailed(body),
            StatusCode::FORBIDDEN => ConnectorError::AuthorizationDenied(body),
            StatusCode::NOT_FOUND => ConnectorError::NotFound(body),
            StatusCode::BAD_REQUEST => ConnectorError::RequestFailed(format!("Bad request: {}", body)),
            s if s.is_server_error() => {
                ConnectorError::RequestFailed(format!("Server error {}: {}", s, body))
            }
            s => ConnectorError::RequestFailed(format!("Unexpected status {}: {}", s, body)),
        })
    }

    /// Adds authentication to a request.
    async fn add_auth(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ConnectorResult<reqwest::RequestBuilder> {
        match &self.config.auth {
            AuthConfig::None => Ok(request),
            AuthConfig::BearerToken { token } => Ok(request.header(
                reqwest::header::AUTHORIZATION,
                token.bearer_header().as_str(),
            )),
            AuthConfig::GcpMetadata { token_url } => {
                let token = self.metadata_token(token_url).await?;
                Ok(request.header(
                    reqwest::header::AUTHORIZATION,
                    token.bearer_header().as_str(),
                ))
            }
        }
    }

    /// Returns a cached metadata-server token, fetching a new one when the
    /// cached token is missing or about to expire.
    async fn metadata_token(&self, token_url: &str) -> ConnectorResult<SecretToken> {
        {
            let cached = self.cached_token.read().await;
            if let Some(t) = &*cached {
                if t.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                    return Ok(t.access_token.clone());
                }
            }
        }

        info!("Fetching access token from metadata server");

        let response = self
            .client
            .get(token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| ConnectorError::AuthenticationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConnectorError::AuthenticationFailed(format!(
                "Metadata token request failed: {}",
                response.status()
            )));
        }

        #[derive(serde::Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;

        let access_token = SecretToken::new(token_response.access_token);
        let mut cached = self.cached_token.write().await;
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token_response.expires_in),
        });

        Ok(access_token)
    }
}

fn map_send_error(e: reqwest::Error) -> ConnectorError {
    if e.is_timeout() {
        ConnectorError::Timeout(e.to_string())
    } else if e.is_connect() {
        ConnectorError::ConnectionFailed(e.to_string())
    } else {
        ConnectorError::RequestFailed(e.to_string())
    }
}

/// Parses a JSON response body.
async fn parse_json_response<T: DeserializeOwned>(response: Response) -> ConnectorResult<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;

    serde_json::from_str(&text).map_err(|e| {
        ConnectorError::InvalidResponse(format!(
            "Failed to parse response (status {}): {} - Body: {}",
            status,
            e,
            text.chars().take(500).collect::<String>()
        ))
    })
}
