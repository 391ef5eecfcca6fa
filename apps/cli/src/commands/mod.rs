//! CLI subcommands

mod actions;
mod apps;
mod groups;
mod ldap;
mod listen;
mod rabbitmq;
mod users;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use krs_keycloak::KeycloakClient;

#[derive(Subcommand)]
pub enum Command {
    /// Listen for Keycloak admin events and print them (optionally watching
    /// group membership through the cache)
    Listen(listen::ListenArgs),

    /// Keycloak group management
    #[command(subcommand)]
    Groups(groups::GroupsCommand),

    /// Keycloak user management
    #[command(subcommand)]
    Users(users::UsersCommand),

    /// Keycloak application ("client") management
    #[command(subcommand)]
    Apps(apps::AppsCommand),

    /// LDAP user entries and the Keycloak federation link
    #[command(subcommand)]
    Ldap(ldap::LdapCommand),

    /// RabbitMQ administration
    #[command(subcommand)]
    Rabbitmq(rabbitmq::RabbitMqCommand),

    /// Remote host actions (quotas, scripts)
    #[command(subcommand)]
    Actions(actions::ActionsCommand),
}

pub async fn run(command: Command) -> Result<()> {
    match command {
        Command::Listen(args) => listen::run(args).await,
        Command::Groups(cmd) => groups::run(cmd).await,
        Command::Users(cmd) => users::run(cmd).await,
        Command::Apps(cmd) => apps::run(cmd).await,
        Command::Ldap(cmd) => ldap::run(cmd).await,
        Command::Rabbitmq(cmd) => rabbitmq::run(cmd).await,
        Command::Actions(cmd) => actions::run(cmd).await,
    }
}

fn keycloak() -> Result<KeycloakClient> {
    KeycloakClient::from_env().context("Failed to configure Keycloak client")
}

/// Print a result as pretty JSON on stdout
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}
