//! # KRS LDAP
//!
//! User entries in the LDAP directory backing Keycloak's user federation.
//!
//! - `config` - Connection settings (`LDAP_*` environment variables)
//! - `user` - Entry records, new users and planned modifications
//! - `client` - Search / add / modify over ldap3, plus the Keycloak link

mod client;
mod config;
mod error;
mod user;

pub use client::LdapClient;
pub use config::{
    LdapConfig, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USER, DEFAULT_USER_BASE, USER_OBJECT_CLASSES,
};
pub use error::{LdapError, LdapResult};
pub use user::{LdapUser, LdapUserUpdate, Modification, NewLdapUser};
