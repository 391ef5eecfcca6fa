//! Group records and hierarchical group paths
//!
//! Group paths are slash-delimited (`/institutions/IceCube/UW-Madison`);
//! ids are the stable directory identifiers behind them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between group path segments
pub const GROUP_PATH_SEPARATOR: char = '/';

/// Group attributes as stored by Keycloak (every value is a list)
pub type GroupAttributes = BTreeMap<String, Vec<String>>;

/// Full group record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub attributes: GroupAttributes,
    #[serde(default)]
    pub sub_groups: Vec<GroupInfo>,
}

/// One entry of the flattened group listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub path: String,
    pub attributes: GroupAttributes,
    /// Names of direct subgroups
    pub children: Vec<String>,
}

/// Every group in the realm, keyed by path
pub type GroupListing = BTreeMap<String, GroupSummary>;

/// Flatten a group tree into a path-keyed listing
pub fn flatten_groups(groups: &[GroupInfo]) -> GroupListing {
    let mut listing = GroupListing::new();
    let mut stack: Vec<&GroupInfo> = groups.iter().collect();

    while let Some(group) = stack.pop() {
        listing.insert(
            group.path.clone(),
            GroupSummary {
                id: group.id.clone(),
                name: group.name.clone(),
                path: group.path.clone(),
                attributes: group.attributes.clone(),
                children: group.sub_groups.iter().map(|g| g.name.clone()).collect(),
            },
        );
        stack.extend(group.sub_groups.iter());
    }

    listing
}

fn trim_path(path: &str) -> &str {
    path.trim_end_matches(GROUP_PATH_SEPARATOR)
}

/// Whether `candidate` is `path` itself or one of its ancestors
///
/// Matching is by whole segments: `/inst` is an ancestor of `/inst/fooU`
/// but not of `/instrument`. The root (`/` or empty) is an ancestor of
/// everything.
pub fn is_ancestor_or_self(candidate: &str, path: &str) -> bool {
    let candidate = trim_path(candidate);
    let path = trim_path(path);

    if candidate.is_empty() {
        return true;
    }

    match path.strip_prefix(candidate) {
        Some(rest) => rest.is_empty() || rest.starts_with(GROUP_PATH_SEPARATOR),
        None => false,
    }
}

/// Parent path (`/a/b` -> `/a`); `None` for top-level groups
pub fn parent_path(path: &str) -> Option<&str> {
    let path = trim_path(path);
    let (parent, _) = path.rsplit_once(GROUP_PATH_SEPARATOR)?;
    if parent.is_empty() {
        None
    } else {
        Some(parent)
    }
}

/// Last segment of a group path
pub fn group_name(path: &str) -> &str {
    let path = trim_path(path);
    path.rsplit(GROUP_PATH_SEPARATOR).next().unwrap_or(path)
}
