use anyhow::{Context, Result};
use clap::Subcommand;

use krs_amqp::{RabbitMqAdmin, RabbitMqConfig};

#[derive(Subcommand)]
pub enum RabbitMqCommand {
    /// Create a user with read access to the event exchange
    CreateUser {
        username: String,
        password: String,
    },
}

pub async fn run(command: RabbitMqCommand) -> Result<()> {
    let admin = RabbitMqAdmin::new(RabbitMqConfig::from_env())?;
    match command {
        RabbitMqCommand::CreateUser { username, password } => admin
            .create_user(&username, &password)
            .await
            .with_context(|| format!("Failed to create RabbitMQ user {username}")),
    }
}
