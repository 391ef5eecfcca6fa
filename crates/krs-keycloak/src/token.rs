//! Service account access tokens
//!
//! Tokens come from the client-credentials grant and are reused until they
//! are about to expire.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use zeroize::Zeroizing;

/// Refresh this many seconds before expiry
pub const REFRESH_BUFFER_SECS: i64 = 30;

/// Token response from the OpenID Connect token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: Option<i64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Access token held by the client
pub struct AccessToken {
    access_token: Zeroizing<String>,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<TokenResponse> for AccessToken {
    fn from(response: TokenResponse) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));

        Self {
            access_token: Zeroizing::new(response.access_token),
            token_type: response.token_type,
            expires_at,
        }
    }
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    /// Check if the token will expire within `buffer_seconds`
    pub fn expires_soon(&self, buffer_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + Duration::seconds(buffer_seconds) >= expires_at,
            None => false,
        }
    }

    pub fn needs_refresh(&self) -> bool {
        self.expires_soon(REFRESH_BUFFER_SECS)
    }

    /// Bearer header value; Keycloak's lowercase `bearer` type is normalised
    pub fn authorization_header(&self) -> String {
        let token_type = if self.token_type.eq_ignore_ascii_case("bearer") {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", token_type, self.access_token.as_str())
    }
}
