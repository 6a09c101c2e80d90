use secrecy::SecretString;
use serde::{Deserialize, Serialize, Serializer};

/// Placeholder emitted instead of a credential.
pub const MASKED_CREDENTIAL: &str = "*****";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default = "generate_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Write-only: accepted on input, always serialized masked.
    #[serde(default = "masked_credential", serialize_with = "serialize_masked")]
    pub credential: SecretString,
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn masked_credential() -> SecretString {
    SecretString::new(MASKED_CREDENTIAL.to_string())
}

fn serialize_masked<S: Serializer>(_: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(MASKED_CREDENTIAL)
}

impl User {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            credential: masked_credential(),
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = SecretString::new(credential.into());
        self
    }
}

/// User lookup criteria understood by the identity back-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserSearch {
    /// Free text matched against username, names and email.
    Text(String),
    /// Per-field matching; empty fields are ignored.
    Fields {
        username: String,
        first_name: String,
        last_name: String,
        email: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_credential_is_never_serialized() {
        let user = User::new("u1", "a@example.com", "Ada", "L").with_credential("hunter2");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains(MASKED_CREDENTIAL));
    }

    #[test]
    fn test_credential_is_accepted_on_input() {
        let user: User = serde_json::from_str(
            r#"{"email":"a@example.com","firstName":"Ada","lastName":"L","credential":"hunter2"}"#,
        )
        .unwrap();
        assert_eq!(user.credential.expose_secret(), "hunter2");
        assert!(uuid::Uuid::parse_str(&user.id).is_ok());
    }
}
