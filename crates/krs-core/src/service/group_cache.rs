//! Group Hierarchy Cache
//!
//! Read-through cache in front of a `GroupDirectory`. Each query shape has
//! its own store and TTL:
//!
//! | store      | key        | TTL (default)  |
//! |------------|------------|----------------|
//! | ids        | group path | 24 x base      |
//! | info       | group id   | 24 x base      |
//! | listing    | singleton  | base / 60      |
//! | membership | group path | base           |
//!
//! Only membership is ever invalidated explicitly; path/id bindings and
//! group records are treated as immutable for their TTL. Directory errors
//! pass through unchanged and are never cached.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::directory::{DirectoryResult, GroupDirectory};
use crate::domain::{is_ancestor_or_self, GroupCacheConfig, GroupInfo, GroupListing};

use super::TtlStore;

/// Live entry counts per store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupCacheStats {
    pub ids: usize,
    pub info: usize,
    pub listing: usize,
    pub membership: usize,
}

pub struct GroupCache {
    directory: Arc<dyn GroupDirectory>,
    ids: TtlStore<String, String>,
    info: TtlStore<String, GroupInfo>,
    listing: TtlStore<(), Arc<GroupListing>>,
    membership: TtlStore<String, Arc<Vec<String>>>,
}

impl GroupCache {
    pub fn new(directory: Arc<dyn GroupDirectory>, config: GroupCacheConfig) -> Self {
        debug!(
            id_ttl_secs = config.id_ttl.as_secs(),
            info_ttl_secs = config.info_ttl.as_secs(),
            listing_ttl_secs = config.listing_ttl.as_secs(),
            membership_ttl_secs = config.membership_ttl.as_secs(),
            capacity = config.capacity,
            "[GroupCache] Created"
        );
        Self {
            directory,
            ids: TtlStore::new(config.id_ttl, config.capacity),
            info: TtlStore::new(config.info_ttl, config.capacity),
            listing: TtlStore::new(config.listing_ttl, 1),
            membership: TtlStore::new(config.membership_ttl, config.capacity),
        }
    }

    /// Every group, keyed by path
    pub async fn list_groups(&self) -> DirectoryResult<Arc<GroupListing>> {
        if let Some(listing) = self.listing.get(&()) {
            return Ok(listing);
        }

        debug!("[GroupCache] Listing miss");
        let listing = Arc::new(self.directory.list_groups().await?);
        self.listing.insert((), listing.clone());
        Ok(listing)
    }

    /// Resolve a group path to its id
    pub async fn get_group_id(&self, path: &str) -> DirectoryResult<String> {
        if let Some(id) = self.ids.get(path) {
            return Ok(id);
        }

        debug!(path, "[GroupCache] Id miss");
        let group = self.directory.group_info(path).await?;
        self.ids.insert(path.to_string(), group.id.clone());
        Ok(group.id)
    }

    /// Full group record for an id
    pub async fn get_group_info_from_id(&self, group_id: &str) -> DirectoryResult<GroupInfo> {
        if let Some(group) = self.info.get(group_id) {
            return Ok(group);
        }

        debug!(group_id, "[GroupCache] Info miss");
        let group = self.directory.group_info_by_id(group_id).await?;
        self.info.insert(group_id.to_string(), group.clone());
        Ok(group)
    }

    /// Usernames of the direct members of a group
    pub async fn get_members(&self, path: &str) -> DirectoryResult<Arc<Vec<String>>> {
        if let Some(members) = self.membership.get(path) {
            return Ok(members);
        }

        let group_id = self.get_group_id(path).await?;
        debug!(path, group_id = %group_id, "[GroupCache] Membership miss");
        let members = Arc::new(self.directory.group_membership_by_id(&group_id).await?);
        self.membership.insert(path.to_string(), members.clone());
        Ok(members)
    }

    /// Drop cached membership
    ///
    /// `None` (or the root path) clears every membership entry. A path drops
    /// the entries for that group and each of its ancestors. Id, info and
    /// listing stores are untouched.
    pub fn invalidate(&self, path: Option<&str>) {
        let removed = match path {
            Some(path) if !path.trim_matches('/').is_empty() => self
                .membership
                .retain(|cached| !is_ancestor_or_self(cached, path)),
            _ => self.membership.clear(),
        };

        info!(
            path = path.unwrap_or("*"),
            removed, "[GroupCache] Invalidated membership"
        );
    }

    pub fn stats(&self) -> GroupCacheStats {
        GroupCacheStats {
            ids: self.ids.len(),
            info: self.info.len(),
            listing: self.listing.len(),
            membership: self.membership.len(),
        }
    }
}
