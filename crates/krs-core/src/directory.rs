//! Group directory trait
//!
//! Interface to the remote hierarchical group store without specifying the
//! implementation (Keycloak admin API, in-memory mock, etc.)

use async_trait::async_trait;

use crate::domain::{GroupInfo, GroupListing};
use crate::error::DirectoryError;

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Remote group directory
///
/// Every call is an independent round-trip; implementations don't retry.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// All groups, keyed by path
    async fn list_groups(&self) -> DirectoryResult<GroupListing>;

    /// Group record for a path (`NotFound` if it doesn't exist)
    async fn group_info(&self, path: &str) -> DirectoryResult<GroupInfo>;

    /// Group record for an id (`NotFound` if it doesn't exist)
    async fn group_info_by_id(&self, group_id: &str) -> DirectoryResult<GroupInfo>;

    /// Usernames of the direct members of a group
    async fn group_membership_by_id(&self, group_id: &str) -> DirectoryResult<Vec<String>>;
}
