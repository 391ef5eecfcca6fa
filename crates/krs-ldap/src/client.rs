//! LDAP client
//!
//! Each operation opens its own connection, binds as the admin DN, and
//! unbinds when done. The connection is driven on a spawned task for as long
//! as the operation runs.

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use krs_keycloak::KeycloakClient;

use crate::config::LdapConfig;
use crate::error::{LdapError, LdapResult};
use crate::user::{LdapUser, LdapUserUpdate, NewLdapUser};

const ALL_USER_ATTRIBUTES: &str = "*";

pub struct LdapClient {
    config: LdapConfig,
}

impl LdapClient {
    pub fn new(config: LdapConfig) -> Self {
        Self { config }
    }

    /// Client configured from `LDAP_*` environment variables
    pub fn from_env() -> LdapResult<Self> {
        Ok(Self::new(LdapConfig::from_env()?))
    }

    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    async fn connect(&self) -> LdapResult<Ldap> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.config.connect_timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.url).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "[LDAP] Connection error");
            }
        });

        ldap.simple_bind(&self.config.admin_user, self.config.admin_password.as_str())
            .await?
            .success()?;
        debug!(url = %self.config.url, bind_dn = %self.config.admin_user, "[LDAP] Bound");
        Ok(ldap)
    }

    async fn search_users(&self, ldap: &mut Ldap, filter: &str) -> LdapResult<Vec<LdapUser>> {
        let (entries, _) = ldap
            .search(
                &self.config.user_base,
                Scope::Subtree,
                filter,
                vec![ALL_USER_ATTRIBUTES],
            )
            .await?
            .success()?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let entry = SearchEntry::construct(entry);
                LdapUser::new(entry.dn, entry.attrs.into_iter().collect())
            })
            .collect())
    }

    async fn find_user(&self, ldap: &mut Ldap, username: &str) -> LdapResult<Option<LdapUser>> {
        let filter = format!("(uid={})", ldap3::ldap_escape(username));
        Ok(self.search_users(ldap, &filter).await?.into_iter().next())
    }

    async fn close(mut ldap: Ldap) {
        if let Err(e) = ldap.unbind().await {
            debug!(error = %e, "[LDAP] Unbind failed");
        }
    }

    /// All users, keyed by username
    ///
    /// With `attributes` set, each entry keeps only those attributes.
    pub async fn list_users(
        &self,
        attributes: Option<&[String]>,
    ) -> LdapResult<BTreeMap<String, LdapUser>> {
        let mut ldap = self.connect().await?;
        let result = self.search_users(&mut ldap, "(uid=*)").await;
        Self::close(ldap).await;

        let mut users = BTreeMap::new();
        for mut user in result? {
            let Some(username) = user.username().map(str::to_string) else {
                continue;
            };
            if let Some(names) = attributes {
                user.retain_attributes(names);
            }
            users.insert(username, user);
        }
        Ok(users)
    }

    pub async fn get_user(&self, username: &str) -> LdapResult<LdapUser> {
        let mut ldap = self.connect().await?;
        let result = self.find_user(&mut ldap, username).await;
        Self::close(ldap).await;

        result?.ok_or_else(|| LdapError::NotFound(username.to_string()))
    }

    pub async fn create_user(&self, user: &NewLdapUser) -> LdapResult<()> {
        user.validate()?;

        let mut ldap = self.connect().await?;
        let result = self.add_user(&mut ldap, user).await;
        Self::close(ldap).await;
        result?;

        info!(username = %user.username, "[LDAP] User created");
        Ok(())
    }

    async fn add_user(&self, ldap: &mut Ldap, user: &NewLdapUser) -> LdapResult<()> {
        if self.find_user(ldap, &user.username).await?.is_some() {
            return Err(LdapError::AlreadyExists(user.username.clone()));
        }

        ldap.add(&self.config.user_dn(&user.username), user.attributes())
            .await?
            .success()?;
        Ok(())
    }

    pub async fn modify_user(&self, username: &str, update: &LdapUserUpdate) -> LdapResult<()> {
        let mut ldap = self.connect().await?;
        let result = self.apply_update(&mut ldap, username, update).await;
        Self::close(ldap).await;
        let changed = result?;

        info!(username, changes = changed, "[LDAP] User modified");
        Ok(())
    }

    async fn apply_update(
        &self,
        ldap: &mut Ldap,
        username: &str,
        update: &LdapUserUpdate,
    ) -> LdapResult<usize> {
        let existing = self
            .find_user(ldap, username)
            .await?
            .ok_or_else(|| LdapError::NotFound(username.to_string()))?;

        let changes = update.plan(&existing)?;
        if changes.is_empty() {
            return Ok(0);
        }

        debug!(username, changes = ?changes, "[LDAP] Modifying user");
        let count = changes.len();
        let mods: Vec<ldap3::Mod<String>> = changes.into_iter().map(|c| c.into_mod()).collect();
        ldap.modify(&existing.dn, mods).await?.success()?;
        Ok(count)
    }

    /// Register this directory as Keycloak's user federation
    ///
    /// Returns `false` if Keycloak already has one.
    pub async fn keycloak_link(&self, keycloak: &KeycloakClient) -> LdapResult<bool> {
        Ok(keycloak
            .create_ldap_federation(&self.config.federation())
            .await?)
    }
}
