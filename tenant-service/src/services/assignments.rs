//! Reshapes flat role-membership facts into per-tenant [`Assignment`]s.

use crate::models::{Assignment, User};
use std::collections::{BTreeMap, BTreeSet};

/// "User holds `role` in `tenant`", in either shape a back-end reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleFact {
    Split { tenant: String, role: String },
    /// `"<tenant>.<role>"`, as stored in the identity back-end.
    Encoded(String),
}

impl RoleFact {
    /// `None` for encoded names without a dot; those are not tenant roles.
    fn into_pair(self) -> Option<(String, String)> {
        match self {
            RoleFact::Split { tenant, role } => Some((tenant, role)),
            RoleFact::Encoded(name) => name
                .split_once('.')
                .map(|(tenant, role)| (tenant.to_string(), role.to_string())),
        }
    }
}

impl From<String> for RoleFact {
    fn from(name: String) -> Self {
        RoleFact::Encoded(name)
    }
}

/// One assignment per tenant in which `user` holds at least one role.
pub fn aggregate<I>(user: &User, facts: I) -> Vec<Assignment>
where
    I: IntoIterator,
    I::Item: Into<RoleFact>,
{
    let mut by_tenant: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let pairs = facts.into_iter().filter_map(|fact| {
        let fact: RoleFact = fact.into();
        fact.into_pair()
    });
    for (tenant, role) in pairs {
        by_tenant.entry(tenant).or_default().insert(role);
    }

    by_tenant
        .into_iter()
        .map(|(tenant, roles)| Assignment {
            tenant,
            user: user.clone(),
            roles,
        })
        .collect()
}

/// One assignment per user holding any of the listed roles of `tenant`.
///
/// `memberships` pairs each role template with the users holding it.
pub fn invert<I>(tenant: &str, memberships: I) -> Vec<Assignment>
where
    I: IntoIterator<Item = (String, Vec<User>)>,
{
    let mut by_user: BTreeMap<String, (User, BTreeSet<String>)> = BTreeMap::new();
    for (role, members) in memberships {
        for user in members {
            by_user
                .entry(user.id.clone())
                .or_insert_with(|| (user, BTreeSet::new()))
                .1
                .insert(role.clone());
        }
    }

    by_user
        .into_values()
        .map(|(user, roles)| Assignment {
            tenant: tenant.to_string(),
            user,
            roles,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> User {
        User::new("u1", "ada@example.com", "Ada", "Lovelace")
    }

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_groups_encoded_facts_by_tenant() {
        let facts = vec![
            "t1.dev".to_string(),
            "t1.ops".to_string(),
            "t2.dev".to_string(),
        ];
        let assignments = aggregate(&ada(), facts);

        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].tenant, "t1");
        assert_eq!(assignments[0].roles, roles(&["dev", "ops"]));
        assert_eq!(assignments[1].tenant, "t2");
        assert_eq!(assignments[1].roles, roles(&["dev"]));
        assert!(assignments.iter().all(|a| a.user.id == "u1"));
    }

    #[test]
    fn test_splits_on_first_dot_and_drops_plain_roles() {
        let facts = vec![
            "offline_access".to_string(),
            "t1.team.lead".to_string(),
            "uma_authorization".to_string(),
        ];
        let assignments = aggregate(&ada(), facts);

        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].tenant, "t1");
        assert_eq!(assignments[0].roles, roles(&["team.lead"]));
    }

    #[test]
    fn test_split_and_encoded_facts_merge() {
        let facts = vec![
            RoleFact::Split {
                tenant: "t1".to_string(),
                role: "dev".to_string(),
            },
            RoleFact::Encoded("t1.dev".to_string()),
            RoleFact::Encoded("t1.".to_string()),
        ];
        let assignments = aggregate(&ada(), facts);

        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].roles, roles(&["", "dev"]));
    }

    #[test]
    fn test_no_facts_no_assignments() {
        assert!(aggregate(&ada(), Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_invert_membership_per_user() {
        let bob = User::new("u2", "bob@example.com", "Bob", "B");
        let memberships = vec![
            ("dev".to_string(), vec![ada(), bob.clone()]),
            ("ops".to_string(), vec![ada()]),
            ("viewer".to_string(), vec![]),
        ];
        let assignments = invert("t1", memberships);

        assert_eq!(assignments.len(), 2);
        let by_id: BTreeMap<_, _> = assignments
            .iter()
            .map(|a| (a.user.id.as_str(), &a.roles))
            .collect();
        assert_eq!(by_id["u1"], &roles(&["dev", "ops"]));
        assert_eq!(by_id["u2"], &roles(&["dev"]));
        assert!(assignments.iter().all(|a| a.tenant == "t1"));
    }
}
