use anyhow::Result;
use clap::Subcommand;

use super::{keycloak, print_json};

#[derive(Subcommand)]
pub enum UsersCommand {
    /// List all users
    List,

    /// User info
    Info {
        username: String,
    },
}

pub async fn run(command: UsersCommand) -> Result<()> {
    let client = keycloak()?;
    match command {
        UsersCommand::List => print_json(&client.list_users().await?),
        UsersCommand::Info { username } => print_json(&client.user_info(&username).await?),
    }
}
