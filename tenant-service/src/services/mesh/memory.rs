use super::{MeshRbac, ObjectMeta, ServiceRole, ServiceRoleBinding};
use crate::services::outcome::{Outcome, ServiceError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Namespace {
    roles: BTreeMap<String, ServiceRole>,
    bindings: BTreeMap<String, ServiceRoleBinding>,
}

/// Mesh RBAC objects kept in process memory.
#[derive(Default)]
pub struct InMemoryMesh {
    namespace: RwLock<Namespace>,
}

impl InMemoryMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mesh whose catalog holds one default role per name.
    pub fn with_catalog<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mesh = Self::new();
        for name in names {
            let mut role = ServiceRole::default_template();
            role.metadata = ObjectMeta {
                name: name.into(),
                labels: BTreeMap::from([("type".to_string(), "tenant-template".to_string())]),
                ..Default::default()
            };
            mesh.insert_role(role);
        }
        mesh
    }

    /// Seeds a catalog entry (or any other role) directly.
    pub fn insert_role(&self, role: ServiceRole) {
        self.write().roles.insert(role.metadata.name.clone(), role);
    }

    pub fn role(&self, name: &str) -> Option<ServiceRole> {
        self.read().roles.get(name).cloned()
    }

    pub fn binding(&self, name: &str) -> Option<ServiceRoleBinding> {
        self.read().bindings.get(name).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, Namespace> {
        self.namespace.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Namespace> {
        self.namespace.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Matches `key=value` selectors joined by commas.
fn selected(role: &ServiceRole, selector: &str) -> bool {
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => role.metadata.labels.get(key).map(String::as_str) == Some(value),
            None => role.metadata.labels.contains_key(term),
        })
}

#[async_trait]
impl MeshRbac for InMemoryMesh {
    async fn get_service_role(&self, name: &str) -> Outcome<ServiceRole> {
        self.role(name).ok_or(ServiceError::NotFound)
    }

    async fn list_service_roles(&self, label_selector: &str) -> Outcome<Vec<ServiceRole>> {
        Ok(self
            .read()
            .roles
            .values()
            .filter(|role| selected(role, label_selector))
            .cloned()
            .collect())
    }

    async fn apply_service_role(&self, role: &ServiceRole) -> Outcome<()> {
        self.insert_role(role.clone());
        Ok(())
    }

    async fn apply_service_role_binding(&self, binding: &ServiceRoleBinding) -> Outcome<()> {
        self.write()
            .bindings
            .insert(binding.metadata.name.clone(), binding.clone());
        Ok(())
    }

    async fn delete_service_role(&self, name: &str) -> Outcome<()> {
        self.write()
            .roles
            .remove(name)
            .map(|_| ())
            .ok_or(ServiceError::NotFound)
    }

    async fn delete_service_role_binding(&self, name: &str) -> Outcome<()> {
        self.write()
            .bindings
            .remove(name)
            .map(|_| ())
            .ok_or(ServiceError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::super::TEMPLATE_SELECTOR;
    use super::*;

    #[tokio::test]
    async fn test_label_selector() {
        let mesh = InMemoryMesh::with_catalog(["viewer"]);
        mesh.insert_role(ServiceRole::default_template().instantiate("t1.viewer", "t1"));

        let listed = mesh.list_service_roles(TEMPLATE_SELECTOR).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metadata.name, "viewer");
    }
}
