//! User federation components
//!
//! Keycloak reads users from an LDAP directory through a
//! `UserStorageProvider` component registered on the realm. Users created in
//! Keycloak are written back to LDAP (`editMode` WRITABLE).

use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::info;
use zeroize::Zeroizing;

use crate::client::{encode, KeycloakClient};
use crate::error::KeycloakResult;

const USER_STORAGE_PROVIDER: &str = "org.keycloak.storage.UserStorageProvider";

/// Component name and provider id of the LDAP federation
pub const LDAP_COMPONENT: &str = "ldap";

/// Settings Keycloak needs to reach the LDAP directory
#[derive(Clone)]
pub struct LdapFederation {
    pub connection_url: String,
    pub bind_dn: String,
    pub bind_credential: Zeroizing<String>,
    /// Base DN of the user entries
    pub users_dn: String,
}

impl fmt::Debug for LdapFederation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapFederation")
            .field("connection_url", &self.connection_url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_credential", &"[REDACTED]")
            .field("users_dn", &self.users_dn)
            .finish()
    }
}

impl LdapFederation {
    /// Component representation for the admin API
    ///
    /// Every config value is a single-element list, as Keycloak stores them.
    pub fn component(&self) -> Value {
        let config = [
            ("connectionUrl", self.connection_url.as_str()),
            ("bindCredential", self.bind_credential.as_str()),
            ("bindDn", self.bind_dn.as_str()),
            ("usersDn", self.users_dn.as_str()),
            ("userObjectClasses", "inetOrgPerson, organizationalPerson"),
            ("usernameLDAPAttribute", "uid"),
            ("uuidLDAPAttribute", "uid"),
            ("rdnLDAPAttribute", "uid"),
            ("fullSyncPeriod", "604800"),
            ("changedSyncPeriod", "60"),
            ("lastSync", "-1"),
            ("batchSizeForSync", "1000"),
            ("pagination", "true"),
            ("connectionPooling", "true"),
            ("cachePolicy", "DEFAULT"),
            ("useKerberosForPasswordAuthentication", "false"),
            ("allowKerberosAuthentication", "false"),
            ("importEnabled", "true"),
            ("enabled", "true"),
            ("syncRegistrations", "true"),
            ("vendor", "other"),
            ("authType", "simple"),
            ("debug", "false"),
            ("searchScope", "1"),
            ("useTruststoreSpi", "ldapsOnly"),
            ("trustEmail", "false"),
            ("priority", "0"),
            ("editMode", "WRITABLE"),
            ("validatePasswordPolicy", "false"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), json!([value])))
        .collect::<serde_json::Map<_, _>>();

        json!({
            "name": LDAP_COMPONENT,
            "providerId": LDAP_COMPONENT,
            "providerType": USER_STORAGE_PROVIDER,
            "config": config,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Component {
    id: String,
}

impl KeycloakClient {
    /// Id of the realm's LDAP federation component, if registered
    pub async fn ldap_federation_id(&self) -> KeycloakResult<Option<String>> {
        let url = format!(
            "components?name={}&type={}",
            encode(LDAP_COMPONENT),
            encode(USER_STORAGE_PROVIDER)
        );
        let components: Vec<Component> = self.get(&url).await?;
        Ok(components.into_iter().next().map(|c| c.id))
    }

    /// Register the LDAP directory as the realm's user federation
    ///
    /// Returns `false` if a federation component is already registered.
    pub async fn create_ldap_federation(&self, federation: &LdapFederation) -> KeycloakResult<bool> {
        if let Some(id) = self.ldap_federation_id().await? {
            info!(component_id = %id, "[Keycloak] LDAP federation already registered");
            return Ok(false);
        }

        self.post("components", &federation.component()).await?;
        info!(
            connection_url = %federation.connection_url,
            users_dn = %federation.users_dn,
            "[Keycloak] LDAP federation registered"
        );
        Ok(true)
    }
}
