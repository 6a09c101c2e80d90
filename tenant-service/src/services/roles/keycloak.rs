use super::RoleService;
use crate::models::{tenant::role_name, Tenant};
use crate::services::identity::{IdentityProvider, RoleRepresentation};
use crate::services::outcome::{absent_is_removed, Outcome};
use async_trait::async_trait;
use std::sync::Arc;

/// Tenant roles as identity back-end realm roles.
pub struct KeycloakRole {
    identity: Arc<dyn IdentityProvider>,
}

impl KeycloakRole {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl RoleService for KeycloakRole {
    fn backend(&self) -> &str {
        "keycloak"
    }

    async fn apply(&self, tenant: &Tenant, template: &str) -> Outcome<()> {
        let role = RoleRepresentation::named(tenant.role_name(template), &tenant.displayed_name);
        tracing::info!(role = %role.name, "Applying realm role");
        self.identity.upsert_role(&role).await
    }

    async fn delete(&self, tenant: &str, template: &str) -> Outcome<()> {
        let name = role_name(tenant, template);
        tracing::info!(role = %name, "Deleting realm role");
        absent_is_removed(self.identity.delete_role(&name).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::identity::InMemoryIdentity;

    #[tokio::test]
    async fn test_apply_replaces_existing_role() {
        let identity = Arc::new(InMemoryIdentity::new());
        let roles = KeycloakRole::new(identity.clone());

        roles.apply(&Tenant::new("t1", "Old", ""), "dev").await.unwrap();
        roles.apply(&Tenant::new("t1", "New", ""), "dev").await.unwrap();

        let role = identity.get_role("t1.dev").await.unwrap();
        assert_eq!(role.description.as_deref(), Some("New"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let identity = Arc::new(InMemoryIdentity::new());
        let roles = KeycloakRole::new(identity);
        assert!(roles.delete("t1", "dev").await.is_ok());
    }
}
