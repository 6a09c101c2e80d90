use super::{
    CredentialRepresentation, GroupRepresentation, IdentityProvider, RoleRepresentation,
    UserRepresentation, SEARCH_LIMIT,
};
use crate::models::UserSearch;
use crate::services::outcome::{Outcome, ServiceError};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Realm {
    groups: BTreeMap<String, GroupRepresentation>,
    roles: BTreeMap<String, RoleRepresentation>,
    users: BTreeMap<String, UserRepresentation>,
    passwords: BTreeMap<String, String>,
    /// user id -> realm role names
    mappings: BTreeMap<String, BTreeSet<String>>,
}

/// Identity back-end kept in process memory.
///
/// Used when Keycloak is disabled and by tests.
#[derive(Default)]
pub struct InMemoryIdentity {
    realm: RwLock<Realm>,
    reject_groups: AtomicBool,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent group creation fail.
    pub fn reject_group_creation(&self, reject: bool) {
        self.reject_groups.store(reject, Ordering::SeqCst);
    }

    pub fn group_count(&self) -> usize {
        self.read().groups.len()
    }

    pub fn role_names(&self) -> BTreeSet<String> {
        self.read().roles.keys().cloned().collect()
    }

    pub fn password_of(&self, user_id: &str) -> Option<String> {
        self.read().passwords.get(user_id).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, Realm> {
        self.realm.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Realm> {
        self.realm.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn contains(value: &Option<String>, needle: &str) -> bool {
    value
        .as_deref()
        .map(|value| value.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

fn matches(user: &UserRepresentation, search: &UserSearch) -> bool {
    match search {
        UserSearch::Text(text) => {
            contains(&user.username, text)
                || contains(&user.email, text)
                || contains(&user.first_name, text)
                || contains(&user.last_name, text)
        }
        UserSearch::Fields {
            username,
            first_name,
            last_name,
            email,
        } => [
            (&user.username, username),
            (&user.first_name, first_name),
            (&user.last_name, last_name),
            (&user.email, email),
        ]
        .into_iter()
        .all(|(value, needle)| needle.is_empty() || contains(value, needle)),
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn list_groups(&self) -> Outcome<Vec<GroupRepresentation>> {
        // Brief representation, like the REST listing.
        Ok(self
            .read()
            .groups
            .values()
            .map(|group| GroupRepresentation {
                attributes: Default::default(),
                ..group.clone()
            })
            .collect())
    }

    async fn create_group(&self, group: &GroupRepresentation) -> Outcome<String> {
        if self.reject_groups.load(Ordering::SeqCst) {
            return Err(ServiceError::message("Keycloak responded with 500 status."));
        }

        let mut realm = self.write();
        if realm.groups.values().any(|existing| existing.name == group.name) {
            return Err(ServiceError::message("Keycloak responded with 409 status."));
        }

        let id = new_id();
        let stored = GroupRepresentation {
            id: Some(id.clone()),
            ..group.clone()
        };
        realm.groups.insert(id.clone(), stored);
        Ok(id)
    }

    async fn get_group(&self, id: &str) -> Outcome<GroupRepresentation> {
        self.read()
            .groups
            .get(id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn update_group(&self, id: &str, group: &GroupRepresentation) -> Outcome<()> {
        let mut realm = self.write();
        let stored = realm.groups.get_mut(id).ok_or(ServiceError::NotFound)?;
        *stored = GroupRepresentation {
            id: Some(id.to_string()),
            ..group.clone()
        };
        Ok(())
    }

    async fn remove_group(&self, id: &str) -> Outcome<()> {
        self.write()
            .groups
            .remove(id)
            .map(|_| ())
            .ok_or(ServiceError::NotFound)
    }

    async fn upsert_role(&self, role: &RoleRepresentation) -> Outcome<()> {
        let mut realm = self.write();
        let id = realm
            .roles
            .get(&role.name)
            .and_then(|existing| existing.id.clone())
            .unwrap_or_else(new_id);
        realm.roles.insert(
            role.name.clone(),
            RoleRepresentation {
                id: Some(id),
                ..role.clone()
            },
        );
        Ok(())
    }

    async fn get_role(&self, name: &str) -> Outcome<RoleRepresentation> {
        self.read()
            .roles
            .get(name)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn delete_role(&self, name: &str) -> Outcome<()> {
        let mut realm = self.write();
        realm.roles.remove(name).ok_or(ServiceError::NotFound)?;
        for roles in realm.mappings.values_mut() {
            roles.remove(name);
        }
        Ok(())
    }

    async fn role_members(&self, name: &str) -> Outcome<Vec<UserRepresentation>> {
        let realm = self.read();
        if !realm.roles.contains_key(name) {
            return Err(ServiceError::NotFound);
        }
        Ok(realm
            .mappings
            .iter()
            .filter(|(_, roles)| roles.contains(name))
            .filter_map(|(user_id, _)| realm.users.get(user_id).cloned())
            .take(SEARCH_LIMIT)
            .collect())
    }

    async fn search_users(&self, search: &UserSearch) -> Outcome<Vec<UserRepresentation>> {
        Ok(self
            .read()
            .users
            .values()
            .filter(|user| matches(user, search))
            .take(SEARCH_LIMIT)
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: &UserRepresentation) -> Outcome<()> {
        let mut realm = self.write();
        if realm.users.values().any(|existing| existing.email == user.email) {
            return Err(ServiceError::EmailCollision);
        }
        let id = new_id();
        realm.users.insert(
            id.clone(),
            UserRepresentation {
                id: Some(id),
                ..user.clone()
            },
        );
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Outcome<UserRepresentation> {
        self.read()
            .users
            .get(id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn delete_user(&self, id: &str) -> Outcome<()> {
        let mut realm = self.write();
        realm.users.remove(id).ok_or(ServiceError::NotFound)?;
        realm.mappings.remove(id);
        realm.passwords.remove(id);
        Ok(())
    }

    async fn reset_password(
        &self,
        id: &str,
        credential: &CredentialRepresentation,
    ) -> Outcome<()> {
        let mut realm = self.write();
        if !realm.users.contains_key(id) {
            return Err(ServiceError::NotFound);
        }
        realm
            .passwords
            .insert(id.to_string(), credential.value.clone());
        Ok(())
    }

    async fn add_realm_roles(&self, user_id: &str, roles: &[RoleRepresentation]) -> Outcome<()> {
        let mut realm = self.write();
        if !realm.users.contains_key(user_id)
            || roles.iter().any(|role| !realm.roles.contains_key(&role.name))
        {
            return Err(ServiceError::NotFound);
        }
        realm
            .mappings
            .entry(user_id.to_string())
            .or_default()
            .extend(roles.iter().map(|role| role.name.clone()));
        Ok(())
    }

    async fn remove_realm_roles(
        &self,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> Outcome<()> {
        let mut realm = self.write();
        if !realm.users.contains_key(user_id) {
            return Err(ServiceError::NotFound);
        }
        if let Some(mapped) = realm.mappings.get_mut(user_id) {
            for role in roles {
                mapped.remove(&role.name);
            }
        }
        Ok(())
    }

    async fn effective_realm_roles(&self, user_id: &str) -> Outcome<Vec<RoleRepresentation>> {
        let realm = self.read();
        if !realm.users.contains_key(user_id) {
            return Err(ServiceError::NotFound);
        }
        Ok(realm
            .mappings
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|name| realm.roles.get(name).cloned())
            .collect())
    }

    async fn health_check(&self) -> Outcome<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> UserRepresentation {
        UserRepresentation {
            username: Some(email.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_group_ids_are_issued_by_back_end() {
        let identity = InMemoryIdentity::new();
        let group = GroupRepresentation {
            name: "requested".to_string(),
            ..Default::default()
        };
        let id = identity.create_group(&group).await.unwrap();
        assert_ne!(id, "requested");
        assert_eq!(
            identity.get_group(&id).await.unwrap().id.as_deref(),
            Some(id.as_str())
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_collides() {
        let identity = InMemoryIdentity::new();
        identity.create_user(&user("a@example.com")).await.unwrap();
        assert!(matches!(
            identity.create_user(&user("a@example.com")).await,
            Err(ServiceError::EmailCollision)
        ));
    }

    #[tokio::test]
    async fn test_missing_artifacts_are_not_found() {
        let identity = InMemoryIdentity::new();
        assert!(identity.remove_group("nope").await.unwrap_err().is_not_found());
        assert!(identity.delete_role("t.dev").await.unwrap_err().is_not_found());
        assert!(identity.get_user("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_field_search_ignores_empty_fields() {
        let identity = InMemoryIdentity::new();
        identity.create_user(&user("ada@example.com")).await.unwrap();
        identity.create_user(&user("bob@example.com")).await.unwrap();

        let search = UserSearch::Fields {
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: "ada".to_string(),
        };
        let found = identity.search_users(&search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email.as_deref(), Some("ada@example.com"));
    }
}
