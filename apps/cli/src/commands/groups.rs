use anyhow::Result;
use clap::Subcommand;

use super::{keycloak, print_json};

#[derive(Subcommand)]
pub enum GroupsCommand {
    /// List all groups
    List,

    /// Group info
    Info {
        /// Group path, e.g. /institutions/IceCube
        path: String,
    },

    /// Usernames of the group's members
    Members {
        /// Group path
        path: String,
    },
}

pub async fn run(command: GroupsCommand) -> Result<()> {
    let client = keycloak()?;
    match command {
        GroupsCommand::List => print_json(&client.list_groups().await?),
        GroupsCommand::Info { path } => print_json(&client.group_info(&path).await?),
        GroupsCommand::Members { path } => print_json(&client.group_membership(&path).await?),
    }
}
