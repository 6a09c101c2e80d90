//! Tenant lifecycle: identity group plus role artifacts on every back-end.

use super::fanout::{fan_out, FanoutReport, RoleOperation};
use super::identity::{GroupRepresentation, IdentityProvider};
use super::metrics::record_lifecycle;
use super::outcome::{absent_is_removed, log_failure, Outcome};
use super::partition::DataPartition;
use super::role_template::RoleTemplateProvider;
use super::roles::RoleService;
use crate::models::Tenant;
use std::sync::Arc;

#[derive(Clone)]
pub struct TenantService {
    identity: Arc<dyn IdentityProvider>,
    backends: Vec<Arc<dyn RoleService>>,
    templates: Arc<dyn RoleTemplateProvider>,
    partition: Arc<dyn DataPartition>,
}

impl TenantService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        backends: Vec<Arc<dyn RoleService>>,
        templates: Arc<dyn RoleTemplateProvider>,
        partition: Arc<dyn DataPartition>,
    ) -> Self {
        Self {
            identity,
            backends,
            templates,
            partition,
        }
    }

    /// Every tenant, in back-end order.
    ///
    /// The group listing omits attributes, so each group is read again. A
    /// failing read is logged and ends the list there.
    pub async fn list(&self) -> Outcome<Vec<Tenant>> {
        let groups = self.identity.list_groups().await?;

        let mut tenants = Vec::with_capacity(groups.len());
        for group in groups {
            let id = group.id.unwrap_or(group.name);
            match self.identity.get_group(&id).await {
                Ok(group) => tenants.push(Tenant::from(group)),
                Err(e) => {
                    log_failure(&e, "Exception occurred during tenant list loading");
                    break;
                }
            }
        }

        Ok(tenants)
    }

    /// Creates the identity group, then applies every template on every
    /// back-end.
    ///
    /// The returned tenant is named by the identifier the identity back-end
    /// issued. If any pair fails the whole call fails, while the pairs that
    /// succeeded stay provisioned.
    pub async fn create(&self, requested: &Tenant) -> Outcome<Tenant> {
        let result = self.provision(requested).await;
        record_lifecycle("create", result.is_ok());
        if let Err(e) = &result {
            log_failure(e, "Exception occurred during tenant creation");
        }
        result
    }

    async fn provision(&self, requested: &Tenant) -> Outcome<Tenant> {
        let group = GroupRepresentation::from(requested);
        let id = self.identity.create_group(&group).await?;
        let actual = requested.renamed(id);
        tracing::info!(tenant = %actual.name, "Tenant group created");

        let templates = self.templates.all().await?;
        let report = fan_out(
            &actual.name,
            RoleOperation::Apply,
            &self.backends,
            &templates,
            |backend, template| {
                let tenant = actual.clone();
                async move { backend.apply(&tenant, &template).await }
            },
        )
        .await;

        report.into_outcome()?;
        tracing::info!(tenant = %actual.name, "Tenant provisioned");
        Ok(actual)
    }

    pub async fn get(&self, name: &str) -> Outcome<Tenant> {
        Ok(self.identity.get_group(name).await?.into())
    }

    /// Updates display metadata only; role artifacts are untouched.
    pub async fn save(&self, tenant: &Tenant) -> Outcome<Tenant> {
        let group = GroupRepresentation::from(tenant);
        self.identity.update_group(&tenant.name, &group).await?;
        Ok(tenant.clone())
    }

    /// Removes the group and every role artifact, and purges the tenant's
    /// data in the background.
    ///
    /// Missing artifacts count as removed, so repeating a delete succeeds.
    /// The purge never affects the result.
    pub async fn delete(&self, name: &str) -> Outcome<()> {
        let partition = Arc::clone(&self.partition);
        let tenant = name.to_string();
        tokio::spawn(async move {
            if let Err(e) = partition.purge(&tenant).await {
                let span = tracing::error_span!("tenant_purge", tenant = %tenant);
                let _entered = span.enter();
                log_failure(&e, "Failed to purge tenant data");
            }
        });

        let (group, roles) = tokio::join!(self.remove_group(name), self.remove_roles(name));
        let result = roles.and(group);

        record_lifecycle("delete", result.is_ok());
        if let Err(e) = &result {
            log_failure(e, "Exception occurred during tenant deletion");
        }
        result
    }

    async fn remove_group(&self, name: &str) -> Outcome<()> {
        absent_is_removed(self.identity.remove_group(name).await)?;
        tracing::debug!(tenant = name, "Tenant group removed");
        Ok(())
    }

    async fn remove_roles(&self, name: &str) -> Outcome<()> {
        let templates = self.templates.all().await?;
        let report: FanoutReport = fan_out(
            name,
            RoleOperation::Delete,
            &self.backends,
            &templates,
            |backend, template| {
                let tenant = name.to_string();
                async move { backend.delete(&tenant, &template).await }
            },
        )
        .await;
        report.into_outcome()
    }
}
