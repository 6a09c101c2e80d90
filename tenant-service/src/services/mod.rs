pub mod assignments;
pub mod bootstrap;
pub mod endpoint;
pub mod fanout;
pub mod identity;
pub mod mesh;
pub mod metrics;
pub mod outcome;
pub mod partition;
pub mod role_template;
pub mod roles;
pub mod tenants;
pub mod users;

pub use identity::{IdentityProvider, InMemoryIdentity, KeycloakClient};
pub use mesh::{InMemoryMesh, KubernetesMeshClient, MeshRbac};
pub use metrics::{get_metrics, init_metrics};
pub use outcome::{log_failure, Outcome, ServiceError};
pub use partition::{DataPartition, MongoPartition, NoopPartition};
pub use role_template::{RoleTemplateProvider, StaticRoleTemplates};
pub use roles::{IstioRole, KeycloakRole, RoleService};
pub use tenants::TenantService;
pub use users::UserService;
