use super::RoleService;
use crate::models::{tenant::role_name, Tenant};
use crate::services::mesh::{MeshRbac, ServiceRole, ServiceRoleBinding, TEMPLATE_SELECTOR};
use crate::services::outcome::{absent_is_removed, Outcome, ServiceError};
use crate::services::role_template::{or_placeholder, RoleTemplateProvider};
use async_trait::async_trait;
use std::sync::Arc;

/// Tenant roles as Istio `ServiceRole` + `ServiceRoleBinding` pairs.
///
/// Also the role catalog: every `ServiceRole` labelled `type=tenant-template`
/// is a template.
pub struct IstioRole {
    mesh: Arc<dyn MeshRbac>,
}

impl IstioRole {
    pub fn new(mesh: Arc<dyn MeshRbac>) -> Self {
        Self { mesh }
    }

    async fn template(&self, template: &str) -> Outcome<ServiceRole> {
        if template.is_empty() {
            return Ok(ServiceRole::default_template());
        }
        self.mesh
            .get_service_role(template)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound => {
                    ServiceError::message(format!("ServiceRole template {} not found", template))
                }
                other => other,
            })
    }
}

#[async_trait]
impl RoleService for IstioRole {
    fn backend(&self) -> &str {
        "istio"
    }

    async fn apply(&self, tenant: &Tenant, template: &str) -> Outcome<()> {
        let name = tenant.role_name(template);
        let role = self.template(template).await?.instantiate(&name, &tenant.name);
        let binding = ServiceRoleBinding::for_role(&name, &tenant.name);

        tracing::info!(service_role = %name, "Applying ServiceRole and ServiceRoleBinding");
        self.mesh.apply_service_role(&role).await?;
        self.mesh.apply_service_role_binding(&binding).await
    }

    async fn delete(&self, tenant: &str, template: &str) -> Outcome<()> {
        let name = role_name(tenant, template);
        tracing::info!(service_role = %name, "Deleting ServiceRole and ServiceRoleBinding");
        absent_is_removed(self.mesh.delete_service_role(&name).await)?;
        absent_is_removed(self.mesh.delete_service_role_binding(&name).await)
    }
}

#[async_trait]
impl RoleTemplateProvider for IstioRole {
    async fn all(&self) -> Outcome<Vec<String>> {
        let names = self
            .mesh
            .list_service_roles(TEMPLATE_SELECTOR)
            .await?
            .into_iter()
            .map(|role| role.metadata.name)
            .collect();
        Ok(or_placeholder(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mesh::{AccessRule, InMemoryMesh, ObjectMeta, ROLES_CLAIM_PROPERTY};
    use std::collections::BTreeMap;

    fn catalog_entry(name: &str, path: &str) -> ServiceRole {
        let mut role = ServiceRole::default_template();
        role.metadata = ObjectMeta {
            name: name.to_string(),
            labels: BTreeMap::from([("type".to_string(), "tenant-template".to_string())]),
            ..Default::default()
        };
        role.spec.rules = vec![AccessRule {
            services: vec!["docs.default.svc.cluster.local".to_string()],
            paths: vec![path.to_string()],
            methods: vec!["GET".to_string()],
        }];
        role
    }

    #[tokio::test]
    async fn test_apply_copies_catalog_role_for_tenant() {
        let mesh = Arc::new(InMemoryMesh::new());
        mesh.insert_role(catalog_entry("viewer", "/{tenant}/docs/*"));
        let istio = IstioRole::new(mesh.clone());

        istio.apply(&Tenant::new("t1", "T", ""), "viewer").await.unwrap();

        let role = mesh.role("t1.viewer").unwrap();
        assert_eq!(role.spec.rules[0].paths, vec!["/t1/docs/*"]);
        assert!(role.metadata.labels.is_empty());

        let binding = mesh.binding("t1.viewer").unwrap();
        assert_eq!(binding.spec.role_ref.name, "t1.viewer");
        assert_eq!(binding.spec.subjects[0].properties[ROLES_CLAIM_PROPERTY], "t1");
    }

    #[tokio::test]
    async fn test_placeholder_template_uses_default_role() {
        let mesh = Arc::new(InMemoryMesh::new());
        let istio = IstioRole::new(mesh.clone());

        assert_eq!(istio.all().await.unwrap(), vec![String::new()]);
        istio.apply(&Tenant::new("t1", "T", ""), "").await.unwrap();
        assert_eq!(mesh.role("t1.").unwrap().spec.rules[0].paths, vec!["/t1/*"]);
    }

    #[tokio::test]
    async fn test_missing_catalog_entry_fails_apply() {
        let istio = IstioRole::new(Arc::new(InMemoryMesh::new()));
        let result = istio.apply(&Tenant::new("t1", "T", ""), "ghost").await;
        assert!(matches!(result, Err(ServiceError::Message(_))));
    }

    #[tokio::test]
    async fn test_delete_twice_succeeds() {
        let mesh = Arc::new(InMemoryMesh::new());
        let istio = IstioRole::new(mesh.clone());
        istio.apply(&Tenant::new("t1", "T", ""), "").await.unwrap();

        assert!(istio.delete("t1", "").await.is_ok());
        assert!(istio.delete("t1", "").await.is_ok());
        assert!(mesh.role("t1.").is_none());
    }
}
