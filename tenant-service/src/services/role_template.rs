use super::outcome::Outcome;
use async_trait::async_trait;

/// Source of the role names every tenant must provision.
#[async_trait]
pub trait RoleTemplateProvider: Send + Sync {
    /// Never empty: an empty catalog yields a single `""` placeholder.
    async fn all(&self) -> Outcome<Vec<String>>;
}

/// Ensures the catalog is never empty.
pub fn or_placeholder(names: Vec<String>) -> Vec<String> {
    if names.is_empty() {
        vec![String::new()]
    } else {
        names
    }
}

/// Fixed catalog taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleTemplates {
    names: Vec<String>,
}

impl StaticRoleTemplates {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl RoleTemplateProvider for StaticRoleTemplates {
    async fn all(&self) -> Outcome<Vec<String>> {
        Ok(or_placeholder(self.names.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_catalog_yields_placeholder() {
        let templates = StaticRoleTemplates::new(Vec::<String>::new());
        assert_eq!(templates.all().await.unwrap(), vec![String::new()]);
    }

    #[tokio::test]
    async fn test_configured_catalog() {
        let templates = StaticRoleTemplates::new(["admin", "developer", "viewer"]);
        assert_eq!(
            templates.all().await.unwrap(),
            vec!["admin", "developer", "viewer"]
        );
    }
}
