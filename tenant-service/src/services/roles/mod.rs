//! Authorization back-ends on which tenant roles are provisioned.

pub mod istio;
pub mod keycloak;

use super::outcome::Outcome;
use crate::models::Tenant;
use async_trait::async_trait;

pub use istio::IstioRole;
pub use keycloak::KeycloakRole;

/// One authorization system holding the `"<tenant>.<template>"` artifacts.
#[async_trait]
pub trait RoleService: Send + Sync {
    /// Identity of the back-end in logs and metrics.
    fn backend(&self) -> &str;

    /// Creates or replaces the artifact for `template` in `tenant`.
    async fn apply(&self, tenant: &Tenant, template: &str) -> Outcome<()>;

    /// Removes the artifact. A missing artifact is not a failure.
    async fn delete(&self, tenant: &str, template: &str) -> Outcome<()>;
}
