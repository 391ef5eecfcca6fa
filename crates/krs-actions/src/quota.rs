//! Storage quotas for user directories

use crate::error::{ActionError, ActionResult};

/// Directory root -> quota command; `{}` is replaced by the user or group
pub const QUOTAS: &[(&str, &str)] = &[
    // production
    (
        "/mnt/homework/homework",
        r#"/sbin/zfs set userquota@"{}"=15G homework/homework"#,
    ),
    (
        "/mnt/homework/public_html",
        r#"/sbin/zfs set userquota@"{}"=3G homework/public_html"#,
    ),
    (
        "/mnt/homework/private_cvmfs",
        r#"/sbin/zfs set userquota@"{}"=10G homework/private_cvmfs"#,
    ),
    (
        "/mnt/lfs7/users",
        "/usr/bin/lfs setquota -g {} --block-softlimit 2000000 --block-hardlimit 2250000 /mnt/lfs7",
    ),
    // testing
    (
        "/mnt/homework/homework_test",
        r#"/sbin/zfs set userquota@"{}"=15G homework/homework_test"#,
    ),
    (
        "/mnt/lfs7/users_test",
        "/usr/bin/lfs setquota -g {} --block-softlimit 2000000 --block-hardlimit 2250000 /mnt/lfs7",
    ),
];

/// Quota command for `user` under the directory root `path`
pub fn quota_command(path: &str, user: &str) -> ActionResult<String> {
    let path = path.trim_end_matches('/');
    QUOTAS
        .iter()
        .find(|(root, _)| *root == path)
        .map(|(_, template)| template.replace("{}", user))
        .ok_or_else(|| ActionError::UnknownQuotaPath(path.to_string()))
}
