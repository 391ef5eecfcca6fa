use anyhow::Result;
use clap::Subcommand;
use krs_keycloak::{AppAccess, BuiltinScope, NewApp};

use super::{keycloak, print_json};

#[derive(Subcommand)]
pub enum AppsCommand {
    /// List apps
    List,

    /// App info
    Info {
        appname: String,
    },

    /// List client scopes
    ListScopes {
        /// Include builtin Keycloak scopes
        #[arg(long)]
        include_builtin: bool,

        /// Include protocol mappers
        #[arg(long)]
        mappers: bool,
    },

    /// Create a new app
    Create {
        appname: String,

        /// App base url
        appurl: String,

        /// App roles
        #[arg(long, value_delimiter = ',', default_value = "read,write")]
        roles: Vec<String>,

        /// Builtin scopes to offer (profile, email, institution)
        #[arg(long, value_delimiter = ',')]
        builtin_scopes: Vec<String>,

        /// Who may request the app scope (public, apps, none)
        #[arg(long, default_value = "public")]
        access: String,

        /// Enable the service account
        #[arg(long)]
        service_account: bool,
    },

    /// Delete an app
    Delete {
        appname: String,
    },

    /// Get app role-group mappings
    GetRoleMappings {
        appname: String,

        /// Role name
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Add an app role-group mapping
    AddRoleMapping {
        appname: String,
        role: String,
        group: String,
    },

    /// Delete an app role-group mapping
    DeleteRoleMapping {
        appname: String,
        role: String,
        group: String,
    },
}

pub async fn run(command: AppsCommand) -> Result<()> {
    let client = keycloak()?;
    match command {
        AppsCommand::List => print_json(&client.list_apps().await?),
        AppsCommand::Info { appname } => print_json(&client.app_info(&appname).await?),
        AppsCommand::ListScopes {
            include_builtin,
            mappers,
        } => print_json(&client.list_scopes(!include_builtin, mappers).await?),
        AppsCommand::Create {
            appname,
            appurl,
            roles,
            builtin_scopes,
            access,
            service_account,
        } => {
            let builtin_scopes = builtin_scopes
                .iter()
                .map(|s| s.parse::<BuiltinScope>())
                .collect::<Result<Vec<_>, _>>()?;
            let new_app = NewApp::new(appname, appurl)
                .with_roles(roles)
                .with_builtin_scopes(builtin_scopes)
                .with_access(access.parse::<AppAccess>()?)
                .with_service_account(service_account);
            let created = client.create_app(&new_app).await?;
            print_json(&serde_json::json!({ "app": new_app.name, "created": created }))
        }
        AppsCommand::Delete { appname } => {
            let deleted = client.delete_app(&appname).await?;
            print_json(&serde_json::json!({ "app": appname, "deleted": deleted }))
        }
        AppsCommand::GetRoleMappings { appname, role } => {
            print_json(&client.get_app_role_mappings(&appname, role.as_deref()).await?)
        }
        AppsCommand::AddRoleMapping {
            appname,
            role,
            group,
        } => {
            let created = client.add_app_role_mapping(&appname, &role, &group).await?;
            print_json(&serde_json::json!({ "created": created }))
        }
        AppsCommand::DeleteRoleMapping {
            appname,
            role,
            group,
        } => {
            let deleted = client
                .delete_app_role_mapping(&appname, &role, &group)
                .await?;
            print_json(&serde_json::json!({ "deleted": deleted }))
        }
    }
}
