//! User entries
//!
//! LDAP attribute names are case-insensitive; lookups here compare them
//! that way, while values keep whatever case the server returned.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

use crate::config::USER_OBJECT_CLASSES;
use crate::error::{LdapError, LdapResult};

const OBJECT_CLASS: &str = "objectClass";

// ============================================================================
// ENTRY
// ============================================================================

/// A user entry as read from the directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LdapUser {
    pub dn: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl LdapUser {
    pub fn new(dn: impl Into<String>, attributes: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }

    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// First value of an attribute
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.values(name).is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.get("uid")
    }

    pub fn has_object_class(&self, class: &str) -> bool {
        self.values(OBJECT_CLASS)
            .is_some_and(|classes| classes.iter().any(|c| c.eq_ignore_ascii_case(class)))
    }

    /// Keep only the named attributes
    pub fn retain_attributes(&mut self, names: &[String]) {
        self.attributes
            .retain(|key, _| names.iter().any(|name| name.eq_ignore_ascii_case(key)));
    }
}

/// Serialises as the attribute mapping; single values are unwrapped
impl Serialize for LdapUser {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields: Map<String, Value> = self
            .attributes
            .iter()
            .map(|(key, values)| {
                let value = match values.as_slice() {
                    [single] => Value::String(single.clone()),
                    many => Value::from(many.to_vec()),
                };
                (key.clone(), value)
            })
            .collect();
        fields.serialize(serializer)
    }
}

// ============================================================================
// NEW USER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct NewLdapUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl NewLdapUser {
    pub fn new(
        username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }

    pub(crate) fn validate(&self) -> LdapResult<()> {
        if self.username.is_empty() {
            return Err(LdapError::InvalidArgument(
                "username must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Attributes of the new entry, object classes included
    pub fn attributes(&self) -> Vec<(String, HashSet<String>)> {
        let single = |name: &str, value: String| (name.to_string(), HashSet::from([value]));
        vec![
            (
                OBJECT_CLASS.to_string(),
                USER_OBJECT_CLASSES.iter().map(|c| c.to_string()).collect(),
            ),
            single("cn", format!("{} {}", self.first_name, self.last_name)),
            single("sn", self.last_name.clone()),
            single("givenName", self.first_name.clone()),
            single("mail", self.email.clone()),
            single("uid", self.username.clone()),
        ]
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// One change to an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    Add(String, HashSet<String>),
    Replace(String, HashSet<String>),
    /// An empty value set deletes the whole attribute
    Delete(String, HashSet<String>),
}

impl Modification {
    pub(crate) fn into_mod(self) -> ldap3::Mod<String> {
        match self {
            Self::Add(name, values) => ldap3::Mod::Add(name, values),
            Self::Replace(name, values) => ldap3::Mod::Replace(name, values),
            Self::Delete(name, values) => ldap3::Mod::Delete(name, values),
        }
    }
}

/// Partial update of a user entry
///
/// Attributes are set (added or replaced) or removed; `None` removes. At
/// most one object class can be added or removed per update.
#[derive(Debug, Clone, Default)]
pub struct LdapUserUpdate {
    pub attributes: BTreeMap<String, Option<Vec<String>>>,
    pub add_object_class: Option<String>,
    pub remove_object_class: Option<String>,
}

impl LdapUserUpdate {
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), Some(vec![value.into()]));
        self
    }

    pub fn set_values(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes.insert(name.into(), Some(values));
        self
    }

    pub fn remove(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), None);
        self
    }

    pub fn add_object_class(mut self, class: impl Into<String>) -> Self {
        self.add_object_class = Some(class.into());
        self
    }

    pub fn remove_object_class(mut self, class: impl Into<String>) -> Self {
        self.remove_object_class = Some(class.into());
        self
    }

    /// Changes needed to bring `existing` in line with this update
    ///
    /// Removing an attribute the entry doesn't have, adding an object class
    /// it already has, or removing one it lacks, produce no change.
    pub fn plan(&self, existing: &LdapUser) -> LdapResult<Vec<Modification>> {
        if self.add_object_class.is_some() && self.remove_object_class.is_some() {
            return Err(LdapError::InvalidArgument(
                "cannot add and remove object classes at once".to_string(),
            ));
        }

        let mut changes = Vec::new();
        for (name, values) in &self.attributes {
            let present = existing.has_attribute(name);
            match values {
                None if present => changes.push(Modification::Delete(name.clone(), HashSet::new())),
                None => {}
                Some(values) => {
                    let values: HashSet<String> = values.iter().cloned().collect();
                    if present {
                        changes.push(Modification::Replace(name.clone(), values));
                    } else {
                        changes.push(Modification::Add(name.clone(), values));
                    }
                }
            }
        }

        if let Some(class) = &self.add_object_class {
            if !existing.has_object_class(class) {
                changes.push(Modification::Add(
                    OBJECT_CLASS.to_string(),
                    HashSet::from([class.clone()]),
                ));
            }
        }
        if let Some(class) = &self.remove_object_class {
            if existing.has_object_class(class) {
                changes.push(Modification::Delete(
                    OBJECT_CLASS.to_string(),
                    HashSet::from([class.clone()]),
                ));
            }
        }

        Ok(changes)
    }
}
