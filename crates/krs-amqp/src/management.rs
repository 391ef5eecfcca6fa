//! RabbitMQ management API

use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{AmqpError, AmqpResult};

pub const DEFAULT_MGMT_URL: &str = "http://localhost:15672";

#[derive(Clone)]
pub struct RabbitMqConfig {
    pub mgmt_url: String,
    pub admin_user: String,
    pub admin_password: Zeroizing<String>,
    pub vhost: String,
    /// Exchange new users may read from
    pub exchange: String,
}

impl Default for RabbitMqConfig {
    fn default() -> Self {
        Self {
            mgmt_url: DEFAULT_MGMT_URL.to_string(),
            admin_user: "admin".to_string(),
            admin_password: Zeroizing::new("admin".to_string()),
            vhost: "keycloak".to_string(),
            exchange: "amq.topic".to_string(),
        }
    }
}

impl fmt::Debug for RabbitMqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RabbitMqConfig")
            .field("mgmt_url", &self.mgmt_url)
            .field("admin_user", &self.admin_user)
            .field("admin_password", &"[REDACTED]")
            .field("vhost", &self.vhost)
            .field("exchange", &self.exchange)
            .finish()
    }
}

impl RabbitMqConfig {
    /// Load from `RABBITMQ_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, default: String| std::env::var(key).unwrap_or(default);

        Self {
            mgmt_url: var("RABBITMQ_MGMT_URL", defaults.mgmt_url),
            admin_user: var("RABBITMQ_ADMIN_USER", defaults.admin_user),
            admin_password: Zeroizing::new(var(
                "RABBITMQ_ADMIN_PASSWORD",
                defaults.admin_password.to_string(),
            )),
            vhost: var("RABBITMQ_VHOST", defaults.vhost),
            exchange: var("RABBITMQ_EXCHANGE", defaults.exchange),
        }
    }
}

pub struct RabbitMqAdmin {
    config: RabbitMqConfig,
    http: reqwest::Client,
}

impl RabbitMqAdmin {
    pub fn new(config: RabbitMqConfig) -> AmqpResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AmqpError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &RabbitMqConfig {
        &self.config
    }

    async fn put(&self, path: &str, body: &Value) -> AmqpResult<()> {
        let url = format!("{}/api/{}", self.config.mgmt_url.trim_end_matches('/'), path);
        debug!(url = %url, "[RabbitMQ] PUT");

        let resp = self
            .http
            .put(&url)
            .basic_auth(&self.config.admin_user, Some(self.config.admin_password.as_str()))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AmqpError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }

    /// Create (or update) a user that can read the configured exchange
    ///
    /// The user gets full permissions on the vhost, and topic permissions
    /// limited to reading from the exchange.
    pub async fn create_user(&self, username: &str, password: &str) -> AmqpResult<()> {
        let user = urlencoding::encode(username);
        let vhost = urlencoding::encode(&self.config.vhost);

        self.put(
            &format!("users/{user}"),
            &json!({ "password": password, "tags": "" }),
        )
        .await?;
        self.put(
            &format!("permissions/{vhost}/{user}"),
            &json!({ "configure": ".*", "write": ".*", "read": ".*" }),
        )
        .await?;
        self.put(
            &format!("topic-permissions/{vhost}/{user}"),
            &json!({ "exchange": self.config.exchange, "write": "", "read": ".*" }),
        )
        .await?;

        info!(username, vhost = %self.config.vhost, "[RabbitMQ] User created");
        Ok(())
    }
}
