//! Users and their tenant roles, straight through to the identity back-end.

use super::assignments::{aggregate, invert};
use super::identity::{CredentialRepresentation, IdentityProvider, UserRepresentation};
use super::outcome::{log_failure, Outcome, ServiceError};
use super::role_template::RoleTemplateProvider;
use crate::models::{tenant::role_name, Assignment, User, UserSearch};
use futures::future::join_all;
use std::sync::Arc;

#[derive(Clone)]
pub struct UserService {
    identity: Arc<dyn IdentityProvider>,
    templates: Arc<dyn RoleTemplateProvider>,
}

impl UserService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        templates: Arc<dyn RoleTemplateProvider>,
    ) -> Self {
        Self {
            identity,
            templates,
        }
    }

    async fn find_by_email(&self, email: &str) -> Outcome<Option<UserRepresentation>> {
        let found = self
            .identity
            .search_users(&UserSearch::Text(email.to_string()))
            .await?;
        Ok(found
            .into_iter()
            .find(|user| user.email.as_deref() == Some(email)))
    }

    /// Creates the user with its email as username, then sets the password.
    pub async fn create(&self, user: &User) -> Outcome<User> {
        if self.find_by_email(&user.email).await?.is_some() {
            return Err(ServiceError::EmailCollision);
        }

        self.identity
            .create_user(&UserRepresentation::from(user))
            .await?;

        let created = self
            .find_by_email(&user.email)
            .await?
            .ok_or_else(|| ServiceError::message("Created user could not be found"))?;
        let id = created.id.clone().unwrap_or_default();
        self.identity
            .reset_password(&id, &CredentialRepresentation::password(&user.credential))
            .await?;

        tracing::info!(user_id = %id, "User created");
        Ok(created.into())
    }

    pub async fn get(&self, id: &str) -> Outcome<User> {
        Ok(self.identity.get_user(id).await?.into())
    }

    pub async fn delete(&self, id: &str) -> Outcome<()> {
        tracing::debug!(user_id = id, "Deleting user");
        self.identity.delete_user(id).await
    }

    pub async fn search(&self, search: &UserSearch) -> Outcome<Vec<User>> {
        Ok(self
            .identity
            .search_users(search)
            .await?
            .into_iter()
            .map(User::from)
            .collect())
    }

    /// Grants `role` of `tenant` to the user.
    pub async fn assign(&self, user_id: &str, tenant: &str, role: &str) -> Outcome<()> {
        let role = self.identity.get_role(&role_name(tenant, role)).await?;
        self.identity.add_realm_roles(user_id, &[role]).await
    }

    /// Revokes `role` of `tenant` from the user.
    pub async fn evict(&self, user_id: &str, tenant: &str, role: &str) -> Outcome<()> {
        let role = self.identity.get_role(&role_name(tenant, role)).await?;
        self.identity.remove_realm_roles(user_id, &[role]).await
    }

    /// The user's roles, grouped by tenant.
    pub async fn assignments(&self, id: &str) -> Outcome<Vec<Assignment>> {
        let user = self.get(id).await?;
        let names = self
            .identity
            .effective_realm_roles(id)
            .await?
            .into_iter()
            .map(|role| role.name);
        Ok(aggregate(&user, names))
    }

    /// Every user holding a role in `tenant`, with those roles.
    ///
    /// A template whose role does not exist contributes no members.
    pub async fn list(&self, tenant: &str) -> Outcome<Vec<Assignment>> {
        let templates = self.templates.all().await?;
        let lookups = templates.into_iter().map(|template| async move {
            let members = self.identity.role_members(&role_name(tenant, &template)).await;
            (template, members)
        });

        let mut memberships: Vec<(String, Vec<User>)> = Vec::new();
        for (template, members) in join_all(lookups).await {
            match members {
                Ok(members) => {
                    memberships.push((template, members.into_iter().map(User::from).collect()))
                }
                Err(ServiceError::NotFound) => {
                    tracing::debug!(tenant, template = %template, "Tenant role not found")
                }
                Err(e) => {
                    log_failure(&e, "Failed to list tenant role members");
                    return Err(e);
                }
            }
        }

        Ok(invert(tenant, memberships))
    }
}
