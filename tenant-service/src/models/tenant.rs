use serde::{Deserialize, Serialize};

/// An isolated workspace.
///
/// `name` is the identifier issued by the identity back-end when the tenant
/// is created. It is immutable afterwards and doubles as the prefix of every
/// role artifact provisioned for the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub name: String,
    pub displayed_name: String,
    #[serde(default)]
    pub description: String,
}

impl Tenant {
    pub fn new(
        name: impl Into<String>,
        displayed_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            displayed_name: displayed_name.into(),
            description: description.into(),
        }
    }

    /// Same display fields under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            displayed_name: self.displayed_name.clone(),
            description: self.description.clone(),
        }
    }

    /// Name of the artifact representing `template` for this tenant.
    pub fn role_name(&self, template: &str) -> String {
        role_name(&self.name, template)
    }
}

/// `"<tenant>.<template>"`, the key shared by every authorization back-end.
pub fn role_name(tenant: &str, template: &str) -> String {
    format!("{}.{}", tenant, template)
}

/// A role every tenant must provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTemplate {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name_is_namespaced_by_tenant() {
        let tenant = Tenant::new("3f2a", "Project", "");
        assert_eq!(tenant.role_name("developer"), "3f2a.developer");
        assert_eq!(tenant.role_name(""), "3f2a.");
    }

    #[test]
    fn test_renamed_keeps_display_fields() {
        let requested = Tenant::new("ignored", "D", "X");
        let actual = requested.renamed("issued-id");
        assert_eq!(actual.name, "issued-id");
        assert_eq!(actual.displayed_name, "D");
        assert_eq!(actual.description, "X");
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let tenant = Tenant::new("t1", "Team One", "first");
        let json = serde_json::to_value(&tenant).unwrap();
        assert_eq!(json["displayedName"], "Team One");
        assert_eq!(json["description"], "first");
    }
}
