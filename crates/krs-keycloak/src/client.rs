//! Keycloak admin REST client
//!
//! Requests go to `{url}/auth/admin/realms/{realm}/...` with a bearer token
//! from the service account. The token is cached and refreshed shortly
//! before it expires. Operations for groups, users and apps live in their
//! own modules as further `impl KeycloakClient` blocks.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::KeycloakConfig;
use crate::error::{KeycloakError, KeycloakResult};
use crate::token::{AccessToken, TokenResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for paged listings (users, group members)
pub(crate) const PAGE_SIZE: usize = 100;

pub struct KeycloakClient {
    config: KeycloakConfig,
    http: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl KeycloakClient {
    pub fn new(config: KeycloakConfig) -> KeycloakResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("krs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KeycloakError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            token: Mutex::new(None),
        })
    }

    /// Client configured from `KEYCLOAK_*` environment variables
    pub fn from_env() -> KeycloakResult<Self> {
        Self::new(KeycloakConfig::from_env()?)
    }

    pub fn config(&self) -> &KeycloakConfig {
        &self.config
    }

    /// Authorization header value, fetching a new token when needed
    ///
    /// The lock is held across the token request so concurrent callers
    /// share one refresh.
    async fn authorization(&self) -> KeycloakResult<String> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if !current.needs_refresh() {
                return Ok(current.authorization_header());
            }
        }

        let fresh = self.fetch_token().await?;
        let header = fresh.authorization_header();
        *token = Some(fresh);
        Ok(header)
    }

    async fn fetch_token(&self) -> KeycloakResult<AccessToken> {
        debug!(
            client_id = %self.config.client_id,
            realm = %self.config.token_realm,
            "[Keycloak] Requesting service account token"
        );

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let resp = self
            .http
            .post(self.config.token_endpoint())
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "[Keycloak] Token request rejected");
            return Err(KeycloakError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = resp.text().await?;
        let response: TokenResponse = serde_json::from_str(&text)?;
        Ok(response.into())
    }

    fn admin_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.admin_base(), path.trim_start_matches('/'))
    }

    /// Send an admin API request, failing on non-success status
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> KeycloakResult<reqwest::Response> {
        let authorization = self.authorization().await?;
        let url = self.admin_url(path);
        debug!(method = %method, url = %url, "[Keycloak] Request");

        let mut request = self
            .http
            .request(method, &url)
            .header(reqwest::header::AUTHORIZATION, authorization);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(KeycloakError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(resp)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> KeycloakResult<T> {
        let resp = self.request(Method::GET, path, None).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub(crate) async fn post(&self, path: &str, body: &Value) -> KeycloakResult<()> {
        self.request(Method::POST, path, Some(body)).await?;
        Ok(())
    }

    pub(crate) async fn put(&self, path: &str, body: Option<&Value>) -> KeycloakResult<()> {
        self.request(Method::PUT, path, body).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, path: &str, body: Option<&Value>) -> KeycloakResult<()> {
        self.request(Method::DELETE, path, body).await?;
        Ok(())
    }
}

/// Percent-encode a single path segment or query value
pub(crate) fn encode(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}
