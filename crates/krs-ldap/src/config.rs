//! LDAP connection settings

use std::fmt;
use std::time::Duration;
use zeroize::Zeroizing;

use krs_keycloak::LdapFederation;

use crate::error::{LdapError, LdapResult};

pub const DEFAULT_ADMIN_USER: &str = "cn=admin,dc=icecube,dc=wisc,dc=edu";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";
pub const DEFAULT_USER_BASE: &str = "ou=people,dc=icecube,dc=wisc,dc=edu";

/// Object classes of a new user entry
pub const USER_OBJECT_CLASSES: [&str; 4] = ["inetOrgPerson", "organizationalPerson", "person", "top"];

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct LdapConfig {
    /// e.g. `ldap://ldap.example.org:389`
    pub url: String,
    /// Bind DN with write access to the user base
    pub admin_user: String,
    pub admin_password: Zeroizing<String>,
    /// Base DN of the user entries (`uid=<username>,<user_base>`)
    pub user_base: String,
    pub connect_timeout: Duration,
}

impl fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConfig")
            .field("url", &self.url)
            .field("admin_user", &self.admin_user)
            .field("admin_password", &"[REDACTED]")
            .field("user_base", &self.user_base)
            .finish()
    }
}

impl LdapConfig {
    pub fn new(url: impl Into<String>) -> LdapResult<Self> {
        let url = url.into();
        if !(url.starts_with("ldap://") || url.starts_with("ldaps://") || url.starts_with("ldapi://")) {
            return Err(LdapError::Config(format!("invalid LDAP_URL {url:?}")));
        }

        Ok(Self {
            url,
            admin_user: DEFAULT_ADMIN_USER.to_string(),
            admin_password: Zeroizing::new(DEFAULT_ADMIN_PASSWORD.to_string()),
            user_base: DEFAULT_USER_BASE.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
        })
    }

    pub fn with_admin(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.admin_user = user.into();
        self.admin_password = Zeroizing::new(password.into());
        self
    }

    pub fn with_user_base(mut self, user_base: impl Into<String>) -> Self {
        self.user_base = user_base.into();
        self
    }

    /// Load from `LDAP_*` environment variables
    pub fn from_env() -> LdapResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LdapResult<Self> {
        let url = lookup("LDAP_URL")
            .filter(|value| !value.is_empty())
            .ok_or_else(|| LdapError::Config("LDAP_URL is not set".to_string()))?;
        let or_default = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self::new(url)?
            .with_admin(
                or_default("LDAP_ADMIN_USER", DEFAULT_ADMIN_USER),
                or_default("LDAP_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            )
            .with_user_base(or_default("LDAP_USER_BASE", DEFAULT_USER_BASE)))
    }

    /// DN of a user entry
    pub fn user_dn(&self, username: &str) -> String {
        format!("uid={},{}", ldap3::dn_escape(username), self.user_base)
    }

    /// Settings for Keycloak's LDAP user federation
    pub fn federation(&self) -> LdapFederation {
        LdapFederation {
            connection_url: self.url.clone(),
            bind_dn: self.admin_user.clone(),
            bind_credential: self.admin_password.clone(),
            users_dn: self.user_base.clone(),
        }
    }
}
