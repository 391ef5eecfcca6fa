use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

use krs_actions::{quota_command, scp_and_run, scp_and_run_sudo, ssh};

#[derive(Subcommand)]
pub enum ActionsCommand {
    /// Print the quota command for a user directory, or run it on a host
    Quota {
        /// Directory root, e.g. /mnt/homework/homework
        path: String,
        user: String,
        /// Run the command on this host (as root) instead of printing it
        #[arg(long)]
        host: Option<String>,
    },

    /// Copy a python script to a host, run it and remove it
    RunScript {
        host: String,
        script: PathBuf,
        /// Remote file name (default: create.py)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        sudo: bool,
    },
}

pub async fn run(command: ActionsCommand) -> Result<()> {
    match command {
        ActionsCommand::Quota { path, user, host } => {
            let command = quota_command(&path, &user)?;
            match host {
                Some(host) => {
                    let args: Vec<&str> = ["sudo"]
                        .into_iter()
                        .chain(command.split_whitespace())
                        .collect();
                    ssh(&host, &args)
                        .await
                        .with_context(|| format!("Failed to set quota for {user} on {host}"))
                }
                None => {
                    println!("{command}");
                    Ok(())
                }
            }
        }
        ActionsCommand::RunScript {
            host,
            script,
            name,
            sudo,
        } => {
            let contents = tokio::fs::read_to_string(&script)
                .await
                .with_context(|| format!("Failed to read {}", script.display()))?;
            let result = if sudo {
                scp_and_run_sudo(&host, &contents, name.as_deref()).await
            } else {
                scp_and_run(&host, &contents, name.as_deref()).await
            };
            result.with_context(|| format!("Script failed on {host}"))
        }
    }
}
