//! Group management
//!
//! Groups are addressed by their slash-delimited path (`/institutions/IceCube`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use krs_core::{
    flatten_groups, group_name, parent_path, DirectoryResult, GroupDirectory, GroupInfo,
    GroupListing,
};

use crate::client::{encode, KeycloakClient, PAGE_SIZE};
use crate::error::{KeycloakError, KeycloakResult};

#[derive(Debug, Deserialize)]
struct Member {
    username: String,
}

/// `group-by-path` wants each segment encoded but the separators kept
fn encode_group_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn check_group_path(path: &str) -> KeycloakResult<()> {
    if !path.starts_with('/') || path.trim_matches('/').is_empty() {
        return Err(KeycloakError::InvalidArgument(format!(
            "group path must be absolute, got {path:?}"
        )));
    }
    Ok(())
}

impl KeycloakClient {
    /// All groups, flattened to a path-keyed listing
    pub async fn list_groups(&self) -> KeycloakResult<GroupListing> {
        let groups: Vec<GroupInfo> = self.get("groups?briefRepresentation=false").await?;
        Ok(flatten_groups(&groups))
    }

    pub async fn group_info(&self, path: &str) -> KeycloakResult<GroupInfo> {
        let url = format!("group-by-path/{}", encode_group_path(path));
        self.get(&url)
            .await
            .map_err(|e| e.or_not_found("group", path))
    }

    pub async fn group_info_by_id(&self, group_id: &str) -> KeycloakResult<GroupInfo> {
        self.get(&format!("groups/{}", encode(group_id)))
            .await
            .map_err(|e| e.or_not_found("group", group_id))
    }

    /// Usernames of the direct members of a group
    pub async fn group_membership_by_id(&self, group_id: &str) -> KeycloakResult<Vec<String>> {
        let mut usernames = Vec::new();
        let mut first = 0;

        loop {
            let url = format!(
                "groups/{}/members?first={}&max={}&briefRepresentation=true",
                encode(group_id),
                first,
                PAGE_SIZE
            );
            let page: Vec<Member> = self
                .get(&url)
                .await
                .map_err(|e| e.or_not_found("group", group_id))?;

            let count = page.len();
            usernames.extend(page.into_iter().map(|m| m.username));
            if count < PAGE_SIZE {
                break;
            }
            first += count;
        }

        Ok(usernames)
    }

    pub async fn group_membership(&self, path: &str) -> KeycloakResult<Vec<String>> {
        let group = self.group_info(path).await?;
        self.group_membership_by_id(&group.id).await
    }

    /// Create a group (and nothing else); the parent must already exist
    ///
    /// Returns `false` if the group was already there.
    pub async fn create_group(&self, path: &str) -> KeycloakResult<bool> {
        check_group_path(path)?;

        match self.group_info(path).await {
            Ok(_) => {
                info!(path, "[Keycloak] Group already exists");
                return Ok(false);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let body = json!({ "name": group_name(path) });
        match parent_path(path) {
            Some(parent) => {
                let parent = self.group_info(parent).await?;
                self.post(&format!("groups/{}/children", encode(&parent.id)), &body)
                    .await?;
            }
            None => self.post("groups", &body).await?,
        }

        info!(path, "[Keycloak] Group created");
        Ok(true)
    }

    /// Delete a group and its subgroups; `false` if it didn't exist
    pub async fn delete_group(&self, path: &str) -> KeycloakResult<bool> {
        let group = match self.group_info(path).await {
            Ok(group) => group,
            Err(e) if e.is_not_found() => {
                info!(path, "[Keycloak] Group does not exist");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        self.delete(&format!("groups/{}", encode(&group.id)), None)
            .await?;
        info!(path, "[Keycloak] Group deleted");
        Ok(true)
    }

    pub async fn add_user_group(&self, path: &str, username: &str) -> KeycloakResult<()> {
        let group = self.group_info(path).await?;
        let user = self.user_info(username).await?;

        self.put(
            &format!("users/{}/groups/{}", encode(&user.id), encode(&group.id)),
            None,
        )
        .await?;
        info!(path, username, "[Keycloak] Added user to group");
        Ok(())
    }

    pub async fn remove_user_group(&self, path: &str, username: &str) -> KeycloakResult<()> {
        let group = self.group_info(path).await?;
        let user = self.user_info(username).await?;

        self.delete(
            &format!("users/{}/groups/{}", encode(&user.id), encode(&group.id)),
            None,
        )
        .await?;
        info!(path, username, "[Keycloak] Removed user from group");
        Ok(())
    }
}

#[async_trait]
impl GroupDirectory for KeycloakClient {
    async fn list_groups(&self) -> DirectoryResult<GroupListing> {
        Ok(KeycloakClient::list_groups(self).await?)
    }

    async fn group_info(&self, path: &str) -> DirectoryResult<GroupInfo> {
        Ok(KeycloakClient::group_info(self, path).await?)
    }

    async fn group_info_by_id(&self, group_id: &str) -> DirectoryResult<GroupInfo> {
        Ok(KeycloakClient::group_info_by_id(self, group_id).await?)
    }

    async fn group_membership_by_id(&self, group_id: &str) -> DirectoryResult<Vec<String>> {
        Ok(KeycloakClient::group_membership_by_id(self, group_id).await?)
    }
}
