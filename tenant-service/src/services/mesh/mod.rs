//! Mesh RBAC back-end boundary (Istio `ServiceRole` / `ServiceRoleBinding`).

pub mod kubernetes;
pub mod memory;

use super::outcome::Outcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use kubernetes::KubernetesMeshClient;
pub use memory::InMemoryMesh;

pub const API_VERSION: &str = "rbac.istio.io/v1alpha1";
pub const SERVICE_ROLE_KIND: &str = "ServiceRole";
pub const SERVICE_ROLE_BINDING_KIND: &str = "ServiceRoleBinding";

/// Label selecting the role catalog.
pub const TEMPLATE_SELECTOR: &str = "type=tenant-template";

/// Replaced by the tenant name in rule paths.
pub const TENANT_PLACEHOLDER: &str = "{tenant}";

/// Subject property matched against the caller's token.
pub const ROLES_CLAIM_PROPERTY: &str = "request.auth.claims[roles]";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRule {
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRoleSpec {
    #[serde(default)]
    pub rules: Vec<AccessRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRole {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ServiceRoleSpec,
}

impl ServiceRole {
    pub fn new(metadata: ObjectMeta, spec: ServiceRoleSpec) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: SERVICE_ROLE_KIND.to_string(),
            metadata,
            spec,
        }
    }

    /// Role used for the empty catalog placeholder: full access below the
    /// tenant's own path.
    pub fn default_template() -> Self {
        Self::new(
            ObjectMeta::named(""),
            ServiceRoleSpec {
                rules: vec![AccessRule {
                    services: vec!["*".to_string()],
                    paths: vec![format!("/{}/*", TENANT_PLACEHOLDER)],
                    methods: vec!["*".to_string()],
                }],
            },
        )
    }

    /// Copy of this role for one tenant: fresh metadata, placeholder resolved.
    pub fn instantiate(&self, name: &str, tenant: &str) -> Self {
        let mut role = Self::new(ObjectMeta::named(name), self.spec.clone());
        for rule in &mut role.spec.rules {
            for path in &mut rule.paths {
                *path = path.replace(TENANT_PLACEHOLDER, tenant);
            }
        }
        role
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleRef {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRoleBindingSpec {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    pub role_ref: RoleRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRoleBinding {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: ServiceRoleBindingSpec,
}

impl ServiceRoleBinding {
    /// Binds role `name` to callers whose roles claim equals `tenant`.
    pub fn for_role(name: &str, tenant: &str) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: SERVICE_ROLE_BINDING_KIND.to_string(),
            metadata: ObjectMeta::named(name),
            spec: ServiceRoleBindingSpec {
                subjects: vec![Subject {
                    user: None,
                    properties: BTreeMap::from([(
                        ROLES_CLAIM_PROPERTY.to_string(),
                        tenant.to_string(),
                    )]),
                }],
                role_ref: RoleRef {
                    kind: SERVICE_ROLE_KIND.to_string(),
                    name: name.to_string(),
                },
            },
        }
    }
}

/// Operations the service needs from the mesh RBAC back-end.
///
/// Missing objects are reported as `ServiceError::NotFound`.
#[async_trait]
pub trait MeshRbac: Send + Sync {
    async fn get_service_role(&self, name: &str) -> Outcome<ServiceRole>;
    async fn list_service_roles(&self, label_selector: &str) -> Outcome<Vec<ServiceRole>>;
    /// Creates the role, replacing one with the same name.
    async fn apply_service_role(&self, role: &ServiceRole) -> Outcome<()>;
    /// Creates the binding, replacing one with the same name.
    async fn apply_service_role_binding(&self, binding: &ServiceRoleBinding) -> Outcome<()>;
    async fn delete_service_role(&self, name: &str) -> Outcome<()>;
    async fn delete_service_role_binding(&self, name: &str) -> Outcome<()>;
}
