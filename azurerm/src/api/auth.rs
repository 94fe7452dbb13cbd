//! Azure AD access tokens for the Resource Manager endpoint

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::error::ApiError;

/// Tokens are refreshed this long before they expire
const EXPIRY_SKEW: Duration = Duration::from_secs(300);

pub enum Credential {
    /// A pre-acquired bearer token, mostly useful in tests
    StaticToken(String),
    ClientSecret(ClientSecretCredential),
}

impl Credential {
    pub async fn token(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        match self {
            Credential::StaticToken(token) => Ok(token.clone()),
            Credential::ClientSecret(credential) => credential.token(http).await,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::StaticToken(_) => f.write_str("StaticToken(..)"),
            Credential::ClientSecret(c) => f
                .debug_struct("ClientSecret")
                .field("tenant_id", &c.tenant_id)
                .field("client_id", &c.client_id)
                .finish_non_exhaustive(),
        }
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// OAuth2 client-credentials flow
pub struct ClientSecretCredential {
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: RwLock<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

impl ClientSecretCredential {
    pub fn new(
        authority_host: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        resource_manager_endpoint: &str,
    ) -> Self {
        Self {
            authority_host: authority_host.trim_end_matches('/').to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scope: format!("{}/.default", resource_manager_endpoint.trim_end_matches('/')),
            cached: RwLock::new(None),
        }
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_host, self.tenant_id)
    }

    pub async fn token(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if Instant::now() + EXPIRY_SKEW < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // another task may have refreshed while we waited for the lock
        if let Some(existing) = cached.as_ref() {
            if Instant::now() + EXPIRY_SKEW < existing.expires_at {
                return Ok(existing.access_token.clone());
            }
        }

        let url = self.token_url();
        tracing::debug!(url = %url, client_id = %self.client_id, "requesting access token");

        let body = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ]
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

        let response = http
            .post(&url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&text)
                .map(|e| format!("{}: {}", e.error, e.error_description))
                .unwrap_or(text);
            return Err(ApiError::Auth(format!(
                "token request for client {} returned HTTP {}: {}",
                self.client_id,
                status.as_u16(),
                detail
            )));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::Parse(format!("token response: {}", e)))?;

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }
}
