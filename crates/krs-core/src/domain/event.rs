//! Admin Events - change notifications published by Keycloak
//!
//! Keycloak's event listener publishes one JSON document per admin operation
//! onto a topic exchange. The envelope types the fields Keycloak documents and
//! keeps everything else in an open extension map, so unknown event shapes
//! pass through untouched. A documented field whose value doesn't have the
//! documented type (or is `null`) also stays in the extension map, so any
//! JSON object decodes and serialises back to itself.
//!
//! The `representation` field is itself a JSON document encoded as a string.
//! It gets a second decode pass; when that fails the raw value is kept.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

// ============================================================================
// RESOURCE / OPERATION TYPES
// ============================================================================

/// Kind of resource an admin event refers to
///
/// Unknown values are preserved in `Other` so newer Keycloak versions
/// don't break decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    Group,
    GroupMembership,
    User,
    Client,
    ClientScope,
    ClientRole,
    RealmRole,
    RealmRoleMapping,
    ClientRoleMapping,
    Realm,
    Component,
    Other(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Group => "GROUP",
            Self::GroupMembership => "GROUP_MEMBERSHIP",
            Self::User => "USER",
            Self::Client => "CLIENT",
            Self::ClientScope => "CLIENT_SCOPE",
            Self::ClientRole => "CLIENT_ROLE",
            Self::RealmRole => "REALM_ROLE",
            Self::RealmRoleMapping => "REALM_ROLE_MAPPING",
            Self::ClientRoleMapping => "CLIENT_ROLE_MAPPING",
            Self::Realm => "REALM",
            Self::Component => "COMPONENT",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for ResourceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "GROUP" => Self::Group,
            "GROUP_MEMBERSHIP" => Self::GroupMembership,
            "USER" => Self::User,
            "CLIENT" => Self::Client,
            "CLIENT_SCOPE" => Self::ClientScope,
            "CLIENT_ROLE" => Self::ClientRole,
            "REALM_ROLE" => Self::RealmRole,
            "REALM_ROLE_MAPPING" => Self::RealmRoleMapping,
            "CLIENT_ROLE_MAPPING" => Self::ClientRoleMapping,
            "REALM" => Self::Realm,
            "COMPONENT" => Self::Component,
            _ => Self::Other(value),
        }
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        match value {
            ResourceType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

/// Admin operation that produced the event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationType {
    Create,
    Update,
    Delete,
    Action,
    Other(String),
}

impl OperationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Action => "ACTION",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for OperationType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "CREATE" => Self::Create,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "ACTION" => Self::Action,
            _ => Self::Other(value),
        }
    }
}

impl From<OperationType> for String {
    fn from(value: OperationType) -> Self {
        match value {
            OperationType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

// ============================================================================
// REPRESENTATION
// ============================================================================

/// The `representation` field of an admin event
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    /// Nested document decoded from the encoded string
    Decoded(Value),
    /// Value kept exactly as received (not a decodable string)
    Raw(Value),
}

impl Representation {
    /// Run the second decode pass over a received value
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(encoded) => match serde_json::from_str(&encoded) {
                Ok(decoded) => Self::Decoded(decoded),
                Err(_) => Self::Raw(Value::String(encoded)),
            },
            other => Self::Raw(other),
        }
    }

    /// The decoded document, if the second pass succeeded
    pub fn decoded(&self) -> Option<&Value> {
        match self {
            Self::Decoded(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    pub fn as_value(&self) -> &Value {
        match self {
            Self::Decoded(value) | Self::Raw(value) => value,
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }
}

impl Serialize for Representation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Representation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

// ============================================================================
// ENVELOPE
// ============================================================================

/// Who performed the admin operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthDetails {
    fn from_map(mut fields: Map<String, Value>) -> Self {
        Self {
            realm_id: take_typed(&mut fields, "realmId"),
            client_id: take_typed(&mut fields, "clientId"),
            user_id: take_typed(&mut fields, "userId"),
            ip_address: take_typed(&mut fields, "ipAddress"),
            extra: fields,
        }
    }
}

impl<'de> Deserialize<'de> for AuthDetails {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_map)
    }
}

/// Move `key` out of `fields` if its value decodes as `T`
///
/// `null` and mistyped values are left where they are.
fn take_typed<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = fields.get(key).filter(|value| !value.is_null())?;
    let typed = T::deserialize(value).ok()?;
    fields.remove(key);
    Some(typed)
}

/// Admin event envelope
///
/// Immutable once handed to a handler. Serialising an event gives back the
/// mapping it was decoded from, except that a decoded `representation`
/// serialises as the nested document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEvent {
    /// Epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_details: Option<AuthDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<OperationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representation: Option<Representation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Every field not held by a typed field above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for AdminEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_map)
    }
}

impl AdminEvent {
    /// Decode a message body
    ///
    /// The body must be a JSON object. A `representation` string that isn't
    /// valid JSON is kept raw rather than failing the whole event.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Build the typed view over a decoded mapping
    ///
    /// Never fails: fields that don't fit their typed slot stay in `extra`.
    pub fn from_map(mut fields: Map<String, Value>) -> Self {
        let auth_details = if matches!(fields.get("authDetails"), Some(Value::Object(_))) {
            match fields.remove("authDetails") {
                Some(Value::Object(details)) => Some(AuthDetails::from_map(details)),
                _ => None,
            }
        } else {
            None
        };

        Self {
            time: take_typed(&mut fields, "time"),
            realm_id: take_typed(&mut fields, "realmId"),
            auth_details,
            resource_type: take_typed(&mut fields, "resourceType"),
            operation_type: take_typed(&mut fields, "operationType"),
            resource_path: take_typed(&mut fields, "resourcePath"),
            // Present means present, even when null
            representation: fields.remove("representation").map(Representation::from_value),
            error: take_typed(&mut fields, "error"),
            extra: fields,
        }
    }

    /// Short name for logging, e.g. `GROUP_MEMBERSHIP.CREATE`
    pub fn kind(&self) -> String {
        format!(
            "{}.{}",
            self.resource_type.as_ref().map_or("UNKNOWN", |r| r.as_str()),
            self.operation_type.as_ref().map_or("UNKNOWN", |o| o.as_str()),
        )
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.time
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
    }

    /// Look up a field that isn't held by the typed envelope
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Field of the decoded representation document
    pub fn representation_field(&self, key: &str) -> Option<&Value> {
        self.representation
            .as_ref()
            .and_then(Representation::decoded)
            .and_then(|doc| doc.get(key))
    }

    /// The event as a plain JSON mapping
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
