//! Application ("client") management
//!
//! An app is a confidential Keycloak client carrying the `app` attribute,
//! paired with a client scope of the same name. Selecting the scope puts the
//! app's roles into the token (`roles.<app>` claim). A generic `public` app
//! can be granted an app's scope when the app allows public access.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::client::{encode, KeycloakClient};
use crate::error::{KeycloakError, KeycloakResult};

/// Client id of the generic public app
pub const PUBLIC_APP: &str = "public";

const OPENID_CONNECT: &str = "openid-connect";

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_url: Option<String>,
    #[serde(default)]
    pub default_client_scopes: Vec<String>,
    #[serde(default)]
    pub optional_client_scopes: Vec<String>,
    #[serde(default)]
    pub service_accounts_enabled: bool,
    #[serde(default, skip_serializing)]
    pub attributes: BTreeMap<String, String>,
}

impl App {
    pub fn is_app(&self) -> bool {
        self.attributes.get("app").is_some_and(|v| !v.is_empty())
    }

    pub fn has_optional_scope(&self, scope: &str) -> bool {
        self.optional_client_scopes.iter().any(|s| s == scope)
    }
}

/// App with its secret and role names
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDetails {
    #[serde(flatten)]
    pub app: App,
    pub client_secret: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientScope {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_mappers: Option<Vec<Value>>,
}

/// Client role; the full representation is needed for role mappings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ClientSecret {
    value: String,
}

/// Who may request an app's scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppAccess {
    /// Any app plus the `public` app
    #[default]
    Public,
    /// Other apps only
    Apps,
    /// Only the app itself
    None,
}

impl AppAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Apps => "apps",
            Self::None => "none",
        }
    }
}

impl fmt::Display for AppAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppAccess {
    type Err = KeycloakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "apps" => Ok(Self::Apps),
            "none" => Ok(Self::None),
            other => Err(KeycloakError::InvalidArgument(format!(
                "access {other:?} is not one of [public, apps, none]"
            ))),
        }
    }
}

/// Built-in Keycloak scopes an app may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinScope {
    /// username, name, groups
    Profile,
    Email,
    Institution,
}

impl BuiltinScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Email => "email",
            Self::Institution => "institution",
        }
    }
}

impl FromStr for BuiltinScope {
    type Err = KeycloakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(Self::Profile),
            "email" => Ok(Self::Email),
            "institution" => Ok(Self::Institution),
            other => Err(KeycloakError::InvalidArgument(format!(
                "scope {other:?} is not one of [profile, email, institution]"
            ))),
        }
    }
}

/// Parameters for `create_app`
#[derive(Debug, Clone)]
pub struct NewApp {
    pub name: String,
    pub url: String,
    pub roles: Vec<String>,
    pub builtin_scopes: Vec<BuiltinScope>,
    pub access: AppAccess,
    pub service_account: bool,
}

impl NewApp {
    /// App with `read`/`write` roles and public access
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            roles: vec!["read".to_string(), "write".to_string()],
            builtin_scopes: Vec::new(),
            access: AppAccess::Public,
            service_account: false,
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_builtin_scopes(mut self, scopes: impl IntoIterator<Item = BuiltinScope>) -> Self {
        self.builtin_scopes = scopes.into_iter().collect();
        self
    }

    pub fn with_access(mut self, access: AppAccess) -> Self {
        self.access = access;
        self
    }

    pub fn with_service_account(mut self, enabled: bool) -> Self {
        self.service_account = enabled;
        self
    }

    fn validate(&self) -> KeycloakResult<()> {
        if self.name.is_empty() {
            return Err(KeycloakError::InvalidArgument(
                "app name must not be empty".to_string(),
            ));
        }
        if !self.url.starts_with("http") {
            return Err(KeycloakError::InvalidArgument(format!(
                "bad app url {:?}",
                self.url
            )));
        }
        Ok(())
    }

    fn client_body(&self) -> Value {
        let url = self.url.trim_end_matches('/');
        json!({
            "access": {"configure": true, "manage": true, "view": true},
            "adminUrl": url,
            "attributes": {
                "app": "true",
                "display.on.consent.screen": "false",
                "exclude.session.state.from.auth.response": "false",
                "tls.client.certificate.bound.access.tokens": "false",
            },
            "authenticationFlowBindingOverrides": {},
            "bearerOnly": false,
            "clientAuthenticatorType": "client-secret",
            "clientId": self.name,
            "consentRequired": true,
            "defaultClientScopes": [],
            "directAccessGrantsEnabled": false,
            "enabled": true,
            "frontchannelLogout": false,
            "fullScopeAllowed": true,
            "implicitFlowEnabled": false,
            "nodeReRegistrationTimeout": -1,
            "notBefore": 0,
            "optionalClientScopes": [],
            "protocol": OPENID_CONNECT,
            "publicClient": false,
            "redirectUris": [format!("{url}/*")],
            "rootUrl": url,
            "serviceAccountsEnabled": self.service_account,
            "standardFlowEnabled": true,
            "surrogateAuthRequired": false,
            "webOrigins": [url],
        })
    }

    fn scope_body(&self) -> Value {
        json!({
            "attributes": {
                "app": "app",
                "access": self.access.as_str(),
                "display.on.consent.screen": "false",
                "include.in.token.scope": "true",
            },
            "name": self.name,
            "protocol": OPENID_CONNECT,
        })
    }

    fn role_mapper_body(&self) -> Value {
        json!({
            "config": {
                "access.token.claim": "true",
                "claim.name": format!("roles.{}", self.name),
                "id.token.claim": "false",
                "jsonType.label": "String",
                "multivalued": "true",
                "userinfo.token.claim": "false",
                "usermodel.clientRoleMapping.clientId": self.name,
            },
            "name": "role-mapper",
            "protocol": OPENID_CONNECT,
            "protocolMapper": "oidc-usermodel-client-role-mapper",
        })
    }
}

/// Role name -> group paths holding that role
pub type RoleMappings = BTreeMap<String, Vec<String>>;

// ============================================================================
// OPERATIONS
// ============================================================================

impl KeycloakClient {
    /// All apps, keyed by client id
    pub async fn list_apps(&self) -> KeycloakResult<BTreeMap<String, App>> {
        let clients: Vec<App> = self.get("clients").await?;
        Ok(clients
            .into_iter()
            .filter(App::is_app)
            .map(|app| (app.client_id.clone(), app))
            .collect())
    }

    async fn find_client(&self, name: &str) -> KeycloakResult<App> {
        let clients: Vec<App> = self
            .get(&format!("clients?clientId={}", encode(name)))
            .await?;
        clients
            .into_iter()
            .find(|c| c.client_id == name)
            .ok_or_else(|| KeycloakError::not_found("app", name))
    }

    async fn client_roles(&self, client_uuid: &str) -> KeycloakResult<Vec<Role>> {
        self.get(&format!("clients/{}/roles", encode(client_uuid)))
            .await
    }

    pub async fn app_info(&self, name: &str) -> KeycloakResult<AppDetails> {
        let app = self.find_client(name).await?;

        let secret: ClientSecret = self
            .get(&format!("clients/{}/client-secret", encode(&app.id)))
            .await?;
        let roles = self
            .client_roles(&app.id)
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect();

        Ok(AppDetails {
            app,
            client_secret: secret.value,
            roles,
        })
    }

    /// OpenID Connect client scopes, keyed by name
    ///
    /// `only_apps` keeps the scopes created for apps; `mappers` includes the
    /// protocol mappers.
    pub async fn list_scopes(
        &self,
        only_apps: bool,
        mappers: bool,
    ) -> KeycloakResult<BTreeMap<String, ClientScope>> {
        let scopes: Vec<ClientScope> = self.get("client-scopes").await?;
        Ok(scopes
            .into_iter()
            .filter(|s| s.protocol == OPENID_CONNECT)
            .filter(|s| !only_apps || s.attributes.contains_key("app"))
            .map(|mut s| {
                if !mappers {
                    s.protocol_mappers = None;
                }
                (s.name.clone(), s)
            })
            .collect())
    }

    async fn attach_optional_scope(&self, client_uuid: &str, scope_id: &str) -> KeycloakResult<()> {
        self.put(
            &format!(
                "clients/{}/optional-client-scopes/{}",
                encode(client_uuid),
                encode(scope_id)
            ),
            None,
        )
        .await
    }

    async fn detach_optional_scope(&self, client_uuid: &str, scope_id: &str) -> KeycloakResult<()> {
        self.delete(
            &format!(
                "clients/{}/optional-client-scopes/{}",
                encode(client_uuid),
                encode(scope_id)
            ),
            None,
        )
        .await
    }

    /// Create an app, its roles and its scope
    ///
    /// Returns `false` without changes if the app already exists.
    pub async fn create_app(&self, new_app: &NewApp) -> KeycloakResult<bool> {
        new_app.validate()?;
        let name = new_app.name.as_str();

        match self.find_client(name).await {
            Ok(_) => {
                info!(app = name, "[Keycloak] App already exists");
                return Ok(false);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        info!(app = name, access = %new_app.access, "[Keycloak] Creating app");
        self.post("clients", &new_app.client_body()).await?;
        let app = self.find_client(name).await?;

        for role in &new_app.roles {
            self.post(
                &format!("clients/{}/roles", encode(&app.id)),
                &json!({ "name": role }),
            )
            .await?;
        }

        let scope_id = match self.list_scopes(true, false).await?.remove(name) {
            Some(scope) => scope.id,
            None => {
                self.post("client-scopes", &new_app.scope_body()).await?;
                let scope = self
                    .list_scopes(true, false)
                    .await?
                    .remove(name)
                    .ok_or_else(|| KeycloakError::not_found("client scope", name))?;
                self.post(
                    &format!("client-scopes/{}/protocol-mappers/models", encode(&scope.id)),
                    &new_app.role_mapper_body(),
                )
                .await?;
                scope.id
            }
        };

        self.attach_optional_scope(&app.id, &scope_id).await?;

        if !new_app.builtin_scopes.is_empty() {
            let all_scopes = self.list_scopes(false, false).await?;
            for builtin in &new_app.builtin_scopes {
                let scope = all_scopes
                    .get(builtin.as_str())
                    .ok_or_else(|| KeycloakError::not_found("client scope", builtin.as_str()))?;
                self.attach_optional_scope(&app.id, &scope.id).await?;
            }
        }

        if new_app.access == AppAccess::Public {
            let public = self.find_client(PUBLIC_APP).await?;
            self.attach_optional_scope(&public.id, &scope_id).await?;
        }
        if matches!(new_app.access, AppAccess::Public | AppAccess::Apps) {
            for other in self.list_apps().await?.values() {
                if !other.has_optional_scope(name) {
                    self.attach_optional_scope(&other.id, &scope_id).await?;
                }
            }
        }

        info!(app = name, "[Keycloak] App created");
        Ok(true)
    }

    /// Delete an app and its scope; `false` if the app didn't exist
    pub async fn delete_app(&self, name: &str) -> KeycloakResult<bool> {
        if let Some(scope) = self.list_scopes(true, false).await?.remove(name) {
            for app in self.list_apps().await?.values() {
                if app.has_optional_scope(name) {
                    self.detach_optional_scope(&app.id, &scope.id).await?;
                }
            }
            match self.find_client(PUBLIC_APP).await {
                Ok(public) if public.has_optional_scope(name) => {
                    self.detach_optional_scope(&public.id, &scope.id).await?;
                }
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }

            self.delete(&format!("client-scopes/{}", encode(&scope.id)), None)
                .await?;
            debug!(app = name, "[Keycloak] App scope deleted");
        }

        match self.find_client(name).await {
            Ok(app) => {
                self.delete(&format!("clients/{}", encode(&app.id)), None)
                    .await?;
                info!(app = name, "[Keycloak] App deleted");
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                info!(app = name, "[Keycloak] App does not exist");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// App details, failing if `role` isn't one of its roles
    async fn app_with_role(&self, name: &str, role: &str) -> KeycloakResult<AppDetails> {
        let app = self.app_info(name).await?;
        if !app.roles.iter().any(|r| r == role) {
            return Err(KeycloakError::not_found("role", format!("{name}/{role}")));
        }
        Ok(app)
    }

    async fn group_client_roles(&self, group_id: &str, client_uuid: &str) -> KeycloakResult<Vec<Role>> {
        self.get(&format!(
            "groups/{}/role-mappings/clients/{}",
            encode(group_id),
            encode(client_uuid)
        ))
        .await
    }

    /// Which groups hold which app roles (all roles, or just `role`)
    pub async fn get_app_role_mappings(
        &self,
        name: &str,
        role: Option<&str>,
    ) -> KeycloakResult<RoleMappings> {
        let app = match role {
            Some(role) => self.app_with_role(name, role).await?,
            None => self.app_info(name).await?,
        };

        let mut mappings = RoleMappings::new();
        for (path, group) in self.list_groups().await? {
            for mapping in self.group_client_roles(&group.id, &app.app.id).await? {
                if role.map_or(true, |r| r == mapping.name) {
                    mappings.entry(mapping.name).or_default().push(path.clone());
                }
            }
        }
        Ok(mappings)
    }

    /// Grant an app role to a group; `false` if already granted
    pub async fn add_app_role_mapping(
        &self,
        name: &str,
        role: &str,
        group: &str,
    ) -> KeycloakResult<bool> {
        let app = self.app_with_role(name, role).await?;
        let group_id = self.group_info(group).await?.id;

        let existing = self.group_client_roles(&group_id, &app.app.id).await?;
        if existing.iter().any(|m| m.name == role) {
            info!(app = name, role, group, "[Keycloak] Role mapping already exists");
            return Ok(false);
        }

        let role_info = self.role_representation(&app.app.id, role).await?;
        self.post(
            &format!(
                "groups/{}/role-mappings/clients/{}",
                encode(&group_id),
                encode(&app.app.id)
            ),
            &json!([role_info]),
        )
        .await?;
        info!(app = name, role, group, "[Keycloak] Role mapping created");
        Ok(true)
    }

    /// Revoke an app role from a group; `false` if it wasn't granted
    pub async fn delete_app_role_mapping(
        &self,
        name: &str,
        role: &str,
        group: &str,
    ) -> KeycloakResult<bool> {
        let app = self.app_with_role(name, role).await?;
        let group_id = self.group_info(group).await?.id;

        let existing = self.group_client_roles(&group_id, &app.app.id).await?;
        if !existing.iter().any(|m| m.name == role) {
            info!(app = name, role, group, "[Keycloak] Role mapping does not exist");
            return Ok(false);
        }

        let role_info = self.role_representation(&app.app.id, role).await?;
        self.delete(
            &format!(
                "groups/{}/role-mappings/clients/{}",
                encode(&group_id),
                encode(&app.app.id)
            ),
            Some(&json!([role_info])),
        )
        .await?;
        info!(app = name, role, group, "[Keycloak] Role mapping deleted");
        Ok(true)
    }

    async fn role_representation(&self, client_uuid: &str, role: &str) -> KeycloakResult<Role> {
        self.client_roles(client_uuid)
            .await?
            .into_iter()
            .find(|r| r.name == role)
            .ok_or_else(|| KeycloakError::not_found("role", role))
    }
}
