//! HTTP request bodies and query strings.

use crate::models::{Tenant, User, UserSearch};
use secrecy::SecretString;
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

/// Body of `POST /tenant`, `PATCH /tenant/:name` and `POST /context/tenant`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TenantRequest {
    /// Advisory; the identity back-end issues the real name.
    #[serde(default)]
    #[validate(length(max = 255))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub displayed_name: String,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub description: String,
}

impl TenantRequest {
    /// The display name falls back to the requested name.
    pub fn into_tenant(self) -> Tenant {
        let displayed_name = if self.displayed_name.is_empty() {
            self.name.clone()
        } else {
            self.displayed_name
        };
        Tenant::new(self.name, displayed_name, self.description)
    }

    /// Display fields from the body under the name taken from the path.
    pub fn into_tenant_named(self, name: &str) -> Tenant {
        self.into_tenant().renamed(name)
    }
}

/// Body of `POST /user`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub last_name: String,
    pub credential: SecretString,
}

impl From<CreateUserRequest> for User {
    fn from(request: CreateUserRequest) -> Self {
        User {
            id: String::new(),
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            credential: request.credential,
        }
    }
}

/// Query of `GET /user/search`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub searching_string: Option<String>,
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl SearchQuery {
    /// Free text and per-field criteria are mutually exclusive.
    pub fn into_search(self) -> Result<UserSearch, AppError> {
        let username = self.user_name.unwrap_or_default();
        let first_name = self.first_name.unwrap_or_default();
        let last_name = self.last_name.unwrap_or_default();
        let email = self.email.unwrap_or_default();

        match self.searching_string {
            Some(text) => {
                let has_fields = [&username, &first_name, &last_name, &email]
                    .iter()
                    .any(|field| !field.is_empty());
                if has_fields {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Wrong params. Use only searchingString or special parameters for different strings"
                    )));
                }
                Ok(UserSearch::Text(text))
            }
            None => Ok(UserSearch::Fields {
                username,
                first_name,
                last_name,
                email,
            }),
        }
    }
}

/// Query of `GET /user`.
#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    pub tenant: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_text_alone() {
        let query = SearchQuery {
            searching_string: Some("ada".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.into_search().unwrap(),
            UserSearch::Text("ada".to_string())
        );
    }

    #[test]
    fn test_search_text_with_field_is_rejected() {
        let query = SearchQuery {
            searching_string: Some("ada".to_string()),
            email: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.into_search(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_search_empty_field_does_not_conflict() {
        let query = SearchQuery {
            searching_string: Some("ada".to_string()),
            user_name: Some(String::new()),
            ..Default::default()
        };
        assert!(query.into_search().is_ok());
    }

    #[test]
    fn test_displayed_name_defaults_to_name() {
        let request: TenantRequest = serde_json::from_str(r#"{"name":"team"}"#).unwrap();
        let tenant = request.into_tenant();
        assert_eq!(tenant.displayed_name, "team");
        assert_eq!(tenant.description, "");
    }

    #[test]
    fn test_patch_uses_path_name() {
        let request: TenantRequest =
            serde_json::from_str(r#"{"name":"other","displayedName":"D","description":"X"}"#)
                .unwrap();
        let tenant = request.into_tenant_named("g-1");
        assert_eq!(tenant.name, "g-1");
        assert_eq!(tenant.displayed_name, "D");
    }

    #[test]
    fn test_invalid_email_fails_validation() {
        let request: CreateUserRequest =
            serde_json::from_str(r#"{"email":"not-an-email","credential":"x"}"#).unwrap();
        assert!(request.validate().is_err());
    }
}
