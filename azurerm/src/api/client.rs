use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::auth::Credential;
use super::common::{ApiQueryParams, ArmErrorResponse};
use super::error::ApiError;

/// Azure Resource Manager REST client
///
/// Cheap to clone; every typed client holds one of these.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    credential: Credential,
    retry_config: RetryConfig,
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl Client {
    /// Create a new API client with default retry configuration
    pub fn new(endpoint: &str, credential: Credential) -> Result<Self, ApiError> {
        Self::with_config(endpoint, credential, RetryConfig::default())
    }

    pub fn with_config(
        endpoint: &str,
        credential: Credential,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .user_agent(concat!("terraform-provider-azurerm/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: endpoint.trim_end_matches('/').to_string(),
                credential,
                retry_config,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// GET a resource. 404 becomes [`ApiError::NotFound`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<T, ApiError> {
        let body = self
            .execute_with_retry(Method::GET, path, api_version, None::<&()>)
            .await?;
        parse_body(path, body.as_deref())
    }

    /// PUT a resource. Accepted-but-empty responses yield `None`.
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<Option<T>, ApiError> {
        let response = self
            .execute_with_retry(Method::PUT, path, api_version, Some(body))
            .await?;
        parse_optional_body(path, response)
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<Option<T>, ApiError> {
        let response = self
            .execute_with_retry(Method::PATCH, path, api_version, Some(body))
            .await?;
        parse_optional_body(path, response)
    }

    /// POST an action such as `sharedKeys`
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<T, ApiError> {
        let body = self
            .execute_with_retry(Method::POST, path, api_version, None::<&()>)
            .await?;
        parse_body(path, body.as_deref())
    }

    pub async fn delete(&self, path: &str, api_version: &str) -> Result<(), ApiError> {
        self.delete_with_params(path, ApiQueryParams::api_version(api_version))
            .await
    }

    pub async fn delete_with_params(
        &self,
        path: &str,
        params: ApiQueryParams,
    ) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, &params, None::<&()>)
            .await
            .map(|_| ())
    }

    async fn execute_with_retry<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&B>,
    ) -> Result<Option<String>, ApiError> {
        self.execute(method, path, &ApiQueryParams::api_version(api_version), body)
            .await
    }

    /// Execute request with retry logic. Returns the response body, or
    /// `None` when the service sent nothing back.
    async fn execute<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &ApiQueryParams,
        body: Option<&B>,
    ) -> Result<Option<String>, ApiError> {
        let retry = &self.inner.retry_config;
        let url = format!("{}{}{}", self.inner.base_url, path, params.to_query_string());
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    retry.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    retry.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying {} {} after {}ms (attempt {})",
                    method,
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let token = self.inner.credential.token(&self.inner.http_client).await?;

            tracing::debug!("{} request to: {}", method, url);
            let mut request = self
                .inner
                .http_client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, format!("Bearer {}", token));
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!("{} {} returned {}", method, path, status);

                    if status.is_success() {
                        let text = response.text().await?;
                        return Ok(if text.trim().is_empty() { None } else { Some(text) });
                    }

                    match status {
                        StatusCode::TOO_MANY_REQUESTS => last_error = Some(ApiError::RateLimited),
                        s if s.is_server_error() => {
                            last_error = Some(ApiError::ServiceUnavailable)
                        }
                        _ => return Err(self.error_from_response(path, response).await),
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(retry.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::Request(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    async fn error_from_response(&self, path: &str, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let (code, message) = match serde_json::from_str::<ArmErrorResponse>(&text) {
            Ok(parsed) => (parsed.error.code, parsed.error.message),
            Err(_) => (String::new(), text),
        };

        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound {
                path: path.to_string(),
            },
            StatusCode::CONFLICT => ApiError::Conflict {
                path: path.to_string(),
                message,
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ApiError::Auth(format!("{} {}", code, message).trim().to_string())
            }
            _ => {
                tracing::error!("API error response for {}: {} {}", path, status, message);
                ApiError::Api {
                    status: status.as_u16(),
                    code,
                    message,
                }
            }
        }
    }
}

fn parse_body<T: DeserializeOwned>(path: &str, body: Option<&str>) -> Result<T, ApiError> {
    let text = body.unwrap_or("null");
    serde_json::from_str(text).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::Parse(format!("response from {}: {}", path, e))
    })
}

fn parse_optional_body<T: DeserializeOwned>(
    path: &str,
    body: Option<String>,
) -> Result<Option<T>, ApiError> {
    match body {
        Some(text) => parse_body(path, Some(&text)).map(Some),
        None => Ok(None),
    }
}
