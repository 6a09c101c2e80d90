use secrecy::SecretString;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct TenantServiceConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub keycloak: KeycloakConfig,
    pub istio: IstioConfig,
    pub tenant: TenantConfig,
    pub initial_user: Option<InitialUserConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakConfig {
    pub uri: String,
    pub realm: String,
    /// Public OIDC client registered in the realm.
    pub client: String,
    pub username: String,
    pub password: SecretString,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IstioConfig {
    pub api_url: String,
    pub namespace: String,
    pub token: Option<SecretString>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantConfig {
    /// Role granted to the caller of `POST /context/tenant`.
    pub default_role: String,
    /// Catalog used when the mesh back-end is disabled.
    pub role_templates: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitialUserConfig {
    pub email: String,
    pub password: SecretString,
    pub role: String,
}

impl TenantServiceConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(TenantServiceConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                enabled: get_flag("MONGODB_ENABLED"),
            },
            keycloak: KeycloakConfig {
                uri: get_env("KEYCLOAK_URI", Some("http://localhost:8080"), is_prod)?,
                realm: get_env("KEYCLOAK_REALM", Some("tenant-security"), is_prod)?,
                client: get_env("KEYCLOAK_CLIENT", Some("tenant-security-ui"), is_prod)?,
                username: get_env("KEYCLOAK_USERNAME", Some("keycloak"), is_prod)?,
                password: SecretString::new(get_env("KEYCLOAK_PASSWORD", Some(""), is_prod)?),
                enabled: get_flag("KEYCLOAK_ENABLED"),
            },
            istio: IstioConfig {
                api_url: get_env(
                    "KUBERNETES_API_URL",
                    Some("https://kubernetes.default.svc"),
                    is_prod,
                )?,
                namespace: get_env("KUBERNETES_NAMESPACE", Some("default"), is_prod)?,
                token: env::var("KUBERNETES_TOKEN").ok().map(SecretString::new),
                enabled: get_flag("ISTIO_ENABLED"),
            },
            tenant: TenantConfig {
                default_role: get_env("TENANT_DEFAULT_ROLE", Some("admin"), is_prod)?,
                role_templates: split_list(&get_env(
                    "ROLE_TEMPLATES",
                    Some("admin,developer,viewer"),
                    is_prod,
                )?),
            },
            initial_user: initial_user(),
        })
    }

    /// In-memory back-ends on a random port.
    pub fn for_tests() -> Self {
        TenantServiceConfig {
            common: core_config::Config::for_tests(),
            mongodb: MongoConfig {
                uri: String::new(),
                enabled: false,
            },
            keycloak: KeycloakConfig {
                uri: String::new(),
                realm: "test".to_string(),
                client: "test-ui".to_string(),
                username: String::new(),
                password: SecretString::new(String::new()),
                enabled: false,
            },
            istio: IstioConfig {
                api_url: String::new(),
                namespace: "default".to_string(),
                token: None,
                enabled: false,
            },
            tenant: TenantConfig {
                default_role: "admin".to_string(),
                role_templates: vec!["admin".to_string(), "viewer".to_string()],
            },
            initial_user: None,
        }
    }
}

/// Present only when every `INIT_USER_*` variable is set.
fn initial_user() -> Option<InitialUserConfig> {
    let email = env::var("INIT_USER_EMAIL").ok().filter(|v| !v.is_empty())?;
    let password = env::var("INIT_USER_PASSWORD").ok().filter(|v| !v.is_empty())?;
    let role = env::var("INIT_USER_ROLE").ok().filter(|v| !v.is_empty())?;
    Some(InitialUserConfig {
        email,
        password: SecretString::new(password),
        role,
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_flag(key: &str) -> bool {
    env::var(key)
        .unwrap_or_else(|_| "false".to_string())
        .parse()
        .unwrap_or(false)
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_skips_blanks() {
        assert_eq!(split_list("admin, ,viewer,"), vec!["admin", "viewer"]);
        assert!(split_list("").is_empty());
    }
}
