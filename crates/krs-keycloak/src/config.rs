//! Keycloak connection settings

use std::fmt;
use url::Url;
use zeroize::Zeroizing;

use crate::error::{KeycloakError, KeycloakResult};

pub const DEFAULT_CLIENT_ID: &str = "rest-access";
pub const DEFAULT_TOKEN_REALM: &str = "master";

#[derive(Clone)]
pub struct KeycloakConfig {
    /// Server root, e.g. `https://keycloak.example.org`
    pub url: Url,
    /// Realm managed through the admin API
    pub realm: String,
    /// Service client used for the client-credentials grant
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    /// Realm the service client lives in
    pub token_realm: String,
}

impl fmt::Debug for KeycloakConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeycloakConfig")
            .field("url", &self.url.as_str())
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_realm", &self.token_realm)
            .finish()
    }
}

impl KeycloakConfig {
    pub fn new(
        url: &str,
        realm: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> KeycloakResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| KeycloakError::Config(format!("invalid KEYCLOAK_URL {url:?}: {e}")))?;
        Ok(Self {
            url,
            realm: realm.into(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: Zeroizing::new(client_secret.into()),
            token_realm: DEFAULT_TOKEN_REALM.to_string(),
        })
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_token_realm(mut self, token_realm: impl Into<String>) -> Self {
        self.token_realm = token_realm.into();
        self
    }

    /// Load from `KEYCLOAK_*` environment variables
    pub fn from_env() -> KeycloakResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> KeycloakResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| KeycloakError::Config(format!("{key} is not set")))
        };

        let config = Self::new(
            &required("KEYCLOAK_URL")?,
            required("KEYCLOAK_REALM")?,
            required("KEYCLOAK_CLIENT_SECRET")?,
        )?;

        Ok(config
            .with_client_id(lookup("KEYCLOAK_CLIENT_ID").unwrap_or_else(|| DEFAULT_CLIENT_ID.into()))
            .with_token_realm(
                lookup("KEYCLOAK_TOKEN_REALM").unwrap_or_else(|| DEFAULT_TOKEN_REALM.into()),
            ))
    }

    fn root(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }

    /// Admin API base for the managed realm
    pub fn admin_base(&self) -> String {
        format!("{}/auth/admin/realms/{}", self.root(), self.realm)
    }

    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/auth/realms/{}/protocol/openid-connect/token",
            self.root(),
            self.token_realm
        )
    }
}
