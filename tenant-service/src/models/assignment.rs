use super::{Tenant, User};
use serde::Serialize;
use std::collections::BTreeSet;

/// The roles one user holds in one tenant.
///
/// Derived on demand from role memberships and never stored. `roles` is
/// never empty: a user without roles in a tenant has no assignment there.
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub tenant: String,
    pub user: User,
    pub roles: BTreeSet<String>,
}

/// The caller's identity together with the tenants it can act in.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityContext {
    pub user: User,
    pub tenants: Vec<Tenant>,
}
