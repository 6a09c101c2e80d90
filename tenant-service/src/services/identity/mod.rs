//! Identity back-end boundary.
//!
//! Groups carry tenants, realm roles carry tenant roles, and role mappings
//! carry assignments. The wire types mirror the Keycloak admin
//! representations so the REST adapter can (de)serialize them directly.

pub mod keycloak;
pub mod memory;

use super::outcome::Outcome;
use crate::models::{Tenant, User, UserSearch, MASKED_CREDENTIAL};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use keycloak::KeycloakClient;
pub use memory::InMemoryIdentity;

pub const DISPLAYED_NAME_ATTRIBUTE: &str = "displayedName";
pub const DESCRIPTION_ATTRIBUTE: &str = "description";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

impl GroupRepresentation {
    fn attribute(&self, key: &str) -> String {
        self.attributes
            .get(key)
            .and_then(|values| values.first())
            .cloned()
            .unwrap_or_default()
    }
}

impl From<&Tenant> for GroupRepresentation {
    fn from(tenant: &Tenant) -> Self {
        let attributes = HashMap::from([
            (
                DISPLAYED_NAME_ATTRIBUTE.to_string(),
                vec![tenant.displayed_name.clone()],
            ),
            (
                DESCRIPTION_ATTRIBUTE.to_string(),
                vec![tenant.description.clone()],
            ),
        ]);

        Self {
            id: None,
            name: tenant.name.clone(),
            path: Some(format!("/{}", tenant.name)),
            attributes,
        }
    }
}

impl From<GroupRepresentation> for Tenant {
    fn from(group: GroupRepresentation) -> Self {
        let displayed_name = group.attribute(DISPLAYED_NAME_ATTRIBUTE);
        let description = group.attribute(DESCRIPTION_ATTRIBUTE);
        Tenant {
            name: group.id.unwrap_or(group.name),
            displayed_name,
            description,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub composite: bool,
}

impl RoleRepresentation {
    pub fn named(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: Some(description.into()),
            composite: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

impl From<&User> for UserRepresentation {
    fn from(user: &User) -> Self {
        Self {
            id: None,
            username: Some(user.email.clone()),
            email: Some(user.email.clone()),
            first_name: Some(user.first_name.clone()),
            last_name: Some(user.last_name.clone()),
            enabled: Some(true),
            email_verified: Some(true),
        }
    }
}

impl From<UserRepresentation> for User {
    fn from(user: UserRepresentation) -> Self {
        User {
            id: user.id.unwrap_or_default(),
            email: user.email.unwrap_or_default(),
            first_name: user.first_name.unwrap_or_default(),
            last_name: user.last_name.unwrap_or_default(),
            credential: SecretString::new(MASKED_CREDENTIAL.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CredentialRepresentation {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
    pub temporary: bool,
}

impl CredentialRepresentation {
    /// Non-temporary password credential.
    pub fn password(secret: &SecretString) -> Self {
        Self {
            kind: "password",
            value: secret.expose_secret().clone(),
            temporary: false,
        }
    }
}

/// Operations the service needs from the identity back-end.
///
/// Implementations report a missing group, role or user as
/// `ServiceError::NotFound` and everything unexpected as `Exception`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Lists groups; attributes may be omitted by the back-end.
    async fn list_groups(&self) -> Outcome<Vec<GroupRepresentation>>;

    /// Creates a group and returns the identifier the back-end issued.
    async fn create_group(&self, group: &GroupRepresentation) -> Outcome<String>;
    async fn get_group(&self, id: &str) -> Outcome<GroupRepresentation>;
    async fn update_group(&self, id: &str, group: &GroupRepresentation) -> Outcome<()>;
    async fn remove_group(&self, id: &str) -> Outcome<()>;

    /// Creates the realm role, replacing one with the same name.
    async fn upsert_role(&self, role: &RoleRepresentation) -> Outcome<()>;
    async fn get_role(&self, name: &str) -> Outcome<RoleRepresentation>;
    async fn delete_role(&self, name: &str) -> Outcome<()>;
    async fn role_members(&self, name: &str) -> Outcome<Vec<UserRepresentation>>;

    async fn search_users(&self, search: &UserSearch) -> Outcome<Vec<UserRepresentation>>;
    async fn create_user(&self, user: &UserRepresentation) -> Outcome<()>;
    async fn get_user(&self, id: &str) -> Outcome<UserRepresentation>;
    async fn delete_user(&self, id: &str) -> Outcome<()>;
    async fn reset_password(&self, id: &str, credential: &CredentialRepresentation)
        -> Outcome<()>;

    async fn add_realm_roles(&self, user_id: &str, roles: &[RoleRepresentation]) -> Outcome<()>;
    async fn remove_realm_roles(&self, user_id: &str, roles: &[RoleRepresentation])
        -> Outcome<()>;
    async fn effective_realm_roles(&self, user_id: &str) -> Outcome<Vec<RoleRepresentation>>;

    async fn health_check(&self) -> Outcome<()>;
}

/// Maximum number of users returned by one search.
pub const SEARCH_LIMIT: usize = 100;
