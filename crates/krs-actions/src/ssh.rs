//! ssh / scp helpers
//!
//! Host keys are neither checked nor recorded; the target hosts are internal
//! and rebuilt often.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ActionError, ActionResult};

pub const SSH_OPTIONS: [&str; 4] = [
    "-o",
    "UserKnownHostsFile=/dev/null",
    "-o",
    "StrictHostKeyChecking=no",
];

const DEFAULT_SCRIPT_NAME: &str = "create.py";

async fn run(program: &str, args: &[&str]) -> ActionResult<()> {
    let rendered = format!("{} {}", program, args.join(" "));
    debug!(command = %rendered, "[Actions] Running");

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await?;

    if !status.success() {
        return Err(ActionError::CommandFailed {
            command: rendered,
            status: status.to_string(),
        });
    }
    Ok(())
}

/// Run a command on `host`
pub async fn ssh(host: &str, args: &[&str]) -> ActionResult<()> {
    let mut argv: Vec<&str> = SSH_OPTIONS.to_vec();
    argv.push(host);
    argv.extend_from_slice(args);
    run("ssh", &argv).await
}

async fn upload_script(host: &str, script: &str, name: &str) -> ActionResult<String> {
    let dir = tempfile::tempdir()?;
    let local = dir.path().join(name);
    tokio::fs::write(&local, script).await?;

    let remote = format!("/tmp/{name}");
    let target = format!("{host}:{remote}");
    let mut argv: Vec<&str> = SSH_OPTIONS.to_vec();
    argv.push(path_str(&local)?);
    argv.push(&target);
    run("scp", &argv).await?;

    Ok(remote)
}

fn path_str(path: &Path) -> ActionResult<&str> {
    path.to_str().ok_or_else(|| {
        ActionError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "temporary path is not valid UTF-8",
        ))
    })
}

async fn run_script(host: &str, script: &str, name: Option<&str>, sudo: bool) -> ActionResult<()> {
    let name = name.unwrap_or(DEFAULT_SCRIPT_NAME);
    let remote = upload_script(host, script, name).await?;

    let mut command = Vec::new();
    if sudo {
        command.push("sudo");
    }
    command.extend(["python", remote.as_str()]);
    let result = ssh(host, &command).await;

    if let Err(e) = ssh(host, &["rm", remote.as_str()]).await {
        warn!(host, remote = %remote, error = %e, "[Actions] Failed to remove remote script");
        if result.is_ok() {
            return Err(e);
        }
    }
    result
}

/// Copy a python script to `host`, run it, then delete it
pub async fn scp_and_run(host: &str, script: &str, name: Option<&str>) -> ActionResult<()> {
    run_script(host, script, name, false).await
}

/// Like `scp_and_run`, but runs the script as root
pub async fn scp_and_run_sudo(host: &str, script: &str, name: Option<&str>) -> ActionResult<()> {
    run_script(host, script, name, true).await
}
