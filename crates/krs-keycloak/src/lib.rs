//! # KRS Keycloak
//!
//! Admin REST client for a Keycloak realm.
//!
//! ## Modules
//!
//! - `config` - Connection settings (`KEYCLOAK_*` environment variables)
//! - `token` - Service account token and refresh rules
//! - `client` - HTTP plumbing shared by the operations below
//! - `groups` - Group hierarchy and membership (implements `GroupDirectory`)
//! - `users` - User records and passwords
//! - `apps` - Apps (clients), their scopes and role mappings
//! - `components` - LDAP user federation

mod apps;
mod client;
mod components;
mod config;
mod error;
mod groups;
mod token;
mod users;

pub use apps::{
    App, AppAccess, AppDetails, BuiltinScope, ClientScope, NewApp, Role, RoleMappings, PUBLIC_APP,
};
pub use client::KeycloakClient;
pub use components::{LdapFederation, LDAP_COMPONENT};
pub use config::{KeycloakConfig, DEFAULT_CLIENT_ID, DEFAULT_TOKEN_REALM};
pub use error::{KeycloakError, KeycloakResult};
pub use token::{AccessToken, TokenResponse, REFRESH_BUFFER_SECS};
pub use users::{NewUser, UserAttributes, UserInfo, UserUpdate};
