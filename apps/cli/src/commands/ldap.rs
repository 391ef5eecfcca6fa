use anyhow::{bail, Context, Result};
use clap::Subcommand;

use krs_ldap::{LdapClient, LdapUserUpdate, NewLdapUser};

use super::{keycloak, print_json};

#[derive(Subcommand)]
pub enum LdapCommand {
    /// List all users
    List {
        /// Only show these attributes (repeatable)
        #[arg(long = "attr")]
        attributes: Vec<String>,
    },

    /// User entry
    Get { username: String },

    /// Create a user entry
    Create {
        username: String,
        first_name: String,
        last_name: String,
        email: String,
    },

    /// Modify a user entry
    Modify {
        username: String,

        /// Set an attribute, as NAME=VALUE (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Remove an attribute (repeatable)
        #[arg(long = "unset", value_name = "NAME")]
        unset: Vec<String>,

        #[arg(long, conflicts_with = "remove_object_class")]
        add_object_class: Option<String>,

        #[arg(long)]
        remove_object_class: Option<String>,
    },

    /// Register the directory as Keycloak's user federation
    LinkKeycloak,
}

pub async fn run(command: LdapCommand) -> Result<()> {
    let client = LdapClient::from_env().context("Failed to configure LDAP client")?;
    match command {
        LdapCommand::List { attributes } => {
            let filter = (!attributes.is_empty()).then_some(attributes.as_slice());
            print_json(&client.list_users(filter).await?)
        }
        LdapCommand::Get { username } => print_json(&client.get_user(&username).await?),
        LdapCommand::Create {
            username,
            first_name,
            last_name,
            email,
        } => {
            let user = NewLdapUser::new(username, first_name, last_name, email);
            client.create_user(&user).await?;
            Ok(())
        }
        LdapCommand::Modify {
            username,
            set,
            unset,
            add_object_class,
            remove_object_class,
        } => {
            let mut update = LdapUserUpdate::default();
            for pair in set {
                let Some((name, value)) = pair.split_once('=') else {
                    bail!("expected NAME=VALUE, got {pair:?}");
                };
                update = update.set(name, value);
            }
            for name in unset {
                update = update.remove(name);
            }
            if let Some(class) = add_object_class {
                update = update.add_object_class(class);
            }
            if let Some(class) = remove_object_class {
                update = update.remove_object_class(class);
            }
            client.modify_user(&username, &update).await?;
            Ok(())
        }
        LdapCommand::LinkKeycloak => {
            let created = client.keycloak_link(&keycloak()?).await?;
            print_json(&serde_json::json!({ "created": created }))
        }
    }
}
