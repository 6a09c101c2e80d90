//! Initial operator account.

use super::identity::{IdentityProvider, RoleRepresentation};
use super::outcome::{Outcome, ServiceError};
use super::users::UserService;
use crate::config::InitialUserConfig;
use crate::models::{User, UserSearch};
use secrecy::ExposeSecret;
use std::sync::Arc;

/// Ensures the operator role and user exist and the user holds the role.
///
/// Safe to run on every start: an existing role or user is kept.
pub async fn bootstrap_operator(
    identity: Arc<dyn IdentityProvider>,
    users: &UserService,
    initial: &InitialUserConfig,
) -> Outcome<()> {
    match identity.get_role(&initial.role).await {
        Ok(_) => tracing::info!(role = %initial.role, "Operator role exists"),
        Err(ServiceError::NotFound) => {
            identity
                .upsert_role(&RoleRepresentation::named(&initial.role, "Initial operator"))
                .await?;
            tracing::info!(role = %initial.role, "Operator role created");
        }
        Err(e) => return Err(e),
    }

    let operator = User::new("", &initial.email, "", "")
        .with_credential(initial.password.expose_secret().as_str());
    match users.create(&operator).await {
        Ok(user) => tracing::info!(user_id = %user.id, "Operator user created"),
        Err(ServiceError::EmailCollision) => {
            tracing::info!(email = %initial.email, "Operator user exists")
        }
        Err(e) => return Err(e),
    }

    let user = users
        .search(&UserSearch::Text(initial.email.clone()))
        .await?
        .into_iter()
        .find(|user| user.email == initial.email)
        .ok_or_else(|| ServiceError::message("Operator user could not be found"))?;

    let role = identity.get_role(&initial.role).await?;
    identity.add_realm_roles(&user.id, &[role]).await?;
    tracing::info!(user_id = %user.id, role = %initial.role, "Operator role granted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::identity::InMemoryIdentity;
    use crate::services::role_template::StaticRoleTemplates;
    use secrecy::SecretString;

    fn initial() -> InitialUserConfig {
        InitialUserConfig {
            email: "admin@example.com".to_string(),
            password: SecretString::new("changeit".to_string()),
            role: "operator".to_string(),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_is_repeatable() {
        let identity = Arc::new(InMemoryIdentity::new());
        let users = UserService::new(identity.clone(), Arc::new(StaticRoleTemplates::default()));

        bootstrap_operator(identity.clone(), &users, &initial()).await.unwrap();
        bootstrap_operator(identity.clone(), &users, &initial()).await.unwrap();

        let found = users
            .search(&UserSearch::Text("admin@example.com".to_string()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let roles = identity.effective_realm_roles(&found[0].id).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "operator");
        assert_eq!(
            identity.password_of(&found[0].id).as_deref(),
            Some("changeit")
        );
    }
}
