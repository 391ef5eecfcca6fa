//! User management

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;

use crate::client::{encode, KeycloakClient, PAGE_SIZE};
use crate::error::{KeycloakError, KeycloakResult};

/// User attributes as stored by Keycloak (every value is a list)
pub type UserAttributes = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub attributes: UserAttributes,
}

impl UserInfo {
    /// First value of an attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub attributes: BTreeMap<String, String>,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Partial user update
///
/// Attributes are merged into the existing ones; `None` removes the key.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub attributes: BTreeMap<String, Option<String>>,
}

impl UserUpdate {
    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn set_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), Some(value.into()));
        self
    }

    pub fn remove_attribute(mut self, key: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), None);
        self
    }

    /// Apply onto an existing user record
    pub fn apply(&self, user: &mut UserInfo) {
        if let Some(first_name) = &self.first_name {
            user.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(email) = &self.email {
            user.email = Some(email.clone());
        }
        for (key, value) in &self.attributes {
            match value {
                Some(value) => {
                    user.attributes.insert(key.clone(), vec![value.clone()]);
                }
                None => {
                    user.attributes.remove(key);
                }
            }
        }
    }
}

fn user_body(user: &UserInfo) -> Value {
    json!({
        "firstName": user.first_name,
        "lastName": user.last_name,
        "email": user.email,
        "attributes": user.attributes,
    })
}

impl KeycloakClient {
    /// All users, keyed by username
    pub async fn list_users(&self) -> KeycloakResult<BTreeMap<String, UserInfo>> {
        let mut users = BTreeMap::new();
        let mut first = 0;

        loop {
            let page: Vec<UserInfo> = self
                .get(&format!("users?first={first}&max={PAGE_SIZE}"))
                .await?;
            let count = page.len();
            users.extend(page.into_iter().map(|u| (u.username.clone(), u)));
            if count < PAGE_SIZE {
                break;
            }
            first += count;
        }

        Ok(users)
    }

    /// User record by exact username
    pub async fn user_info(&self, username: &str) -> KeycloakResult<UserInfo> {
        let url = format!("users?exact=true&username={}", encode(username));
        let users: Vec<UserInfo> = self.get(&url).await?;
        users
            .into_iter()
            .find(|u| u.username == username)
            .ok_or_else(|| KeycloakError::not_found("user", username))
    }

    pub async fn create_user(&self, user: &NewUser) -> KeycloakResult<()> {
        if user.username.is_empty() {
            return Err(KeycloakError::InvalidArgument(
                "username must not be empty".to_string(),
            ));
        }

        let attributes: UserAttributes = user
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect();
        let body = json!({
            "username": user.username,
            "firstName": user.first_name,
            "lastName": user.last_name,
            "email": user.email,
            "enabled": true,
            "attributes": attributes,
        });
        self.post("users", &body).await?;

        info!(username = %user.username, "[Keycloak] User created");
        Ok(())
    }

    pub async fn modify_user(&self, username: &str, update: &UserUpdate) -> KeycloakResult<()> {
        let mut user = self.user_info(username).await?;
        update.apply(&mut user);

        self.put(&format!("users/{}", encode(&user.id)), Some(&user_body(&user)))
            .await?;
        info!(username, "[Keycloak] User modified");
        Ok(())
    }

    /// Set a permanent password
    pub async fn set_user_password(&self, username: &str, password: &str) -> KeycloakResult<()> {
        if password.is_empty() {
            return Err(KeycloakError::InvalidArgument(
                "password must not be empty".to_string(),
            ));
        }

        let user = self.user_info(username).await?;
        let body = json!({
            "type": "password",
            "value": password,
            "temporary": false,
        });
        self.put(
            &format!("users/{}/reset-password", encode(&user.id)),
            Some(&body),
        )
        .await?;
        info!(username, "[Keycloak] User password set");
        Ok(())
    }

    pub async fn delete_user(&self, username: &str) -> KeycloakResult<()> {
        let user = self.user_info(username).await?;
        self.delete(&format!("users/{}", encode(&user.id)), None)
            .await?;
        info!(username, "[Keycloak] User deleted");
        Ok(())
    }
}
