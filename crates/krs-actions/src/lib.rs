//! # KRS Actions
//!
//! Helpers for acting on remote hosts after directory changes.
//!
//! - `ssh` - run commands and one-off scripts over ssh/scp
//! - `quota` - storage quota commands per filesystem path

mod error;
mod quota;
mod ssh;

pub use error::{ActionError, ActionResult};
pub use quota::{quota_command, QUOTAS};
pub use ssh::{scp_and_run, scp_and_run_sudo, ssh, SSH_OPTIONS};
