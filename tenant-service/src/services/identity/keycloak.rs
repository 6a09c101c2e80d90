//! Keycloak admin REST adapter.

use super::{
    CredentialRepresentation, GroupRepresentation, IdentityProvider, RoleRepresentation,
    UserRepresentation, SEARCH_LIMIT,
};
use crate::config::KeycloakConfig;
use crate::models::UserSearch;
use crate::services::endpoint::endpoint;
use crate::services::outcome::{Outcome, ServiceError};
use async_trait::async_trait;
use reqwest::{header::LOCATION, Client, RequestBuilder, Response, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ADMIN_CLIENT_ID: &str = "admin-cli";
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(10);
const ROLES_CLAIM: &str = "roles";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AdminToken {
    value: String,
    expires_at: Instant,
}

pub struct KeycloakClient {
    config: KeycloakConfig,
    client: Client,
    token: Mutex<Option<AdminToken>>,
}

impl KeycloakClient {
    pub fn new(config: KeycloakConfig) -> Outcome<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            config,
            client,
            token: Mutex::new(None),
        })
    }

    pub fn realm(&self) -> &str {
        &self.config.realm
    }

    fn url(&self, segments: &[&str]) -> Outcome<Url> {
        endpoint(&self.config.uri, segments)
    }

    /// `<uri>/admin/realms/<realm>/<segments..>`
    fn admin_url(&self, segments: &[&str]) -> Outcome<Url> {
        let mut full = vec!["admin", "realms", self.config.realm.as_str()];
        full.extend_from_slice(segments);
        self.url(&full)
    }

    /// Admin token from the master realm, refreshed shortly before expiry.
    async fn access_token(&self) -> Outcome<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let url = self.url(&["realms", "master", "protocol", "openid-connect", "token"])?;
        let response = self
            .client
            .post(url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", ADMIN_CLIENT_ID),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.expose_secret().as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = Self::check(response).await?.json().await?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(AdminToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        tracing::debug!("Refreshed Keycloak admin token");

        Ok(token.access_token)
    }

    /// Sends an authenticated request without interpreting the status.
    async fn execute(&self, request: RequestBuilder) -> Outcome<Response> {
        let token = self.access_token().await?;
        Ok(request.bearer_auth(token).send().await?)
    }

    /// Sends an authenticated request and interprets the status.
    async fn send(&self, request: RequestBuilder) -> Outcome<Response> {
        let response = self.execute(request).await?;
        Self::check(response).await
    }

    /// The single place Keycloak statuses become [`ServiceError`]s.
    async fn check(response: Response) -> Outcome<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound);
        }

        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::exception(anyhow::anyhow!(
            "Keycloak responded with {} for {}: {}",
            status,
            url,
            body
        )))
    }

    /// Creates the realm when missing and exposes realm roles as the
    /// `roles` claim.
    pub async fn ensure_realm(&self) -> Outcome<()> {
        match self.send(self.client.get(self.admin_url(&[])?)).await {
            Ok(_) => tracing::info!(realm = %self.config.realm, "Keycloak realm exists"),
            Err(ServiceError::NotFound) => {
                tracing::info!(realm = %self.config.realm, "Creating Keycloak realm");
                let body = json!({
                    "id": self.config.realm,
                    "realm": self.config.realm,
                    "enabled": true,
                });
                let url = self.url(&["admin", "realms"])?;
                let response = self.execute(self.client.post(url).json(&body)).await?;
                if response.status() != StatusCode::CONFLICT {
                    Self::check(response).await?;
                }
            }
            Err(e) => return Err(e),
        }

        self.map_realm_roles_claim().await
    }

    async fn map_realm_roles_claim(&self) -> Outcome<()> {
        let scopes: Vec<Value> = self
            .send(self.client.get(self.admin_url(&["client-scopes"])?))
            .await?
            .json()
            .await?;
        let Some(scope_id) = scopes
            .iter()
            .find(|scope| scope["name"] == "roles")
            .and_then(|scope| scope["id"].as_str())
        else {
            tracing::warn!("Client scope 'roles' not found; roles claim left unchanged");
            return Ok(());
        };

        let mappers_path = ["client-scopes", scope_id, "protocol-mappers", "models"];
        let mappers: Vec<Value> = self
            .send(self.client.get(self.admin_url(&mappers_path)?))
            .await?
            .json()
            .await?;
        let Some(mut mapper) = mappers
            .into_iter()
            .find(|mapper| mapper["name"] == "realm roles")
        else {
            tracing::warn!("Protocol mapper 'realm roles' not found; roles claim left unchanged");
            return Ok(());
        };

        let mapper_id = mapper["id"].as_str().unwrap_or_default().to_string();
        mapper["config"]["claim.name"] = json!(ROLES_CLAIM);
        let mut path = mappers_path.to_vec();
        path.push(mapper_id.as_str());
        self.send(self.client.put(self.admin_url(&path)?).json(&mapper))
            .await?;

        tracing::info!(scope = scope_id, mapper = %mapper_id, "Realm roles mapped to roles claim");
        Ok(())
    }

    /// Registers the public OIDC client; an existing client is kept.
    pub async fn ensure_client(&self) -> Outcome<()> {
        let body = json!({
            "clientId": self.config.client,
            "enabled": true,
            "clientAuthenticatorType": "client-secret",
            "protocol": "openid-connect",
            "publicClient": true,
            "standardFlowEnabled": true,
            "directAccessGrantsEnabled": true,
        });
        let response = self
            .execute(self.client.post(self.admin_url(&["clients"])?).json(&body))
            .await?;
        if response.status() == StatusCode::CONFLICT {
            tracing::info!(client = %self.config.client, "Keycloak client exists");
            return Ok(());
        }
        Self::check(response).await?;
        tracing::info!(client = %self.config.client, "Created Keycloak client");
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for KeycloakClient {
    async fn list_groups(&self) -> Outcome<Vec<GroupRepresentation>> {
        Ok(self
            .send(self.client.get(self.admin_url(&["groups"])?))
            .await?
            .json()
            .await?)
    }

    async fn create_group(&self, group: &GroupRepresentation) -> Outcome<String> {
        let response = self
            .execute(self.client.post(self.admin_url(&["groups"])?).json(group))
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::message(format!(
                "Keycloak responded with {} status.",
                status.as_u16()
            )));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|location| location.to_str().ok())
            .and_then(|location| location.rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ServiceError::message("Keycloak did not return the created group location."))
    }

    async fn get_group(&self, id: &str) -> Outcome<GroupRepresentation> {
        Ok(self
            .send(self.client.get(self.admin_url(&["groups", id])?))
            .await?
            .json()
            .await?)
    }

    async fn update_group(&self, id: &str, group: &GroupRepresentation) -> Outcome<()> {
        self.send(
            self.client
                .put(self.admin_url(&["groups", id])?)
                .json(group),
        )
        .await?;
        Ok(())
    }

    async fn remove_group(&self, id: &str) -> Outcome<()> {
        self.send(self.client.delete(self.admin_url(&["groups", id])?))
            .await?;
        Ok(())
    }

    async fn upsert_role(&self, role: &RoleRepresentation) -> Outcome<()> {
        let response = self
            .execute(self.client.post(self.admin_url(&["roles"])?).json(role))
            .await?;
        if response.status() != StatusCode::CONFLICT {
            Self::check(response).await?;
            return Ok(());
        }

        tracing::debug!(role = %role.name, "Role exists, replacing");
        self.send(
            self.client
                .put(self.admin_url(&["roles", role.name.as_str()])?)
                .json(role),
        )
        .await?;
        Ok(())
    }

    async fn get_role(&self, name: &str) -> Outcome<RoleRepresentation> {
        Ok(self
            .send(self.client.get(self.admin_url(&["roles", name])?))
            .await?
            .json()
            .await?)
    }

    async fn delete_role(&self, name: &str) -> Outcome<()> {
        self.send(self.client.delete(self.admin_url(&["roles", name])?))
            .await?;
        Ok(())
    }

    async fn role_members(&self, name: &str) -> Outcome<Vec<UserRepresentation>> {
        let max = SEARCH_LIMIT.to_string();
        Ok(self
            .send(
                self.client
                    .get(self.admin_url(&["roles", name, "users"])?)
                    .query(&[("first", "0"), ("max", max.as_str())]),
            )
            .await?
            .json()
            .await?)
    }

    async fn search_users(&self, search: &UserSearch) -> Outcome<Vec<UserRepresentation>> {
        let max = SEARCH_LIMIT.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("first", "0"),
            ("max", max.as_str()),
            ("briefRepresentation", "true"),
        ];
        match search {
            UserSearch::Text(text) => query.push(("search", text.as_str())),
            UserSearch::Fields {
                username,
                first_name,
                last_name,
                email,
            } => {
                let fields = [
                    ("username", username),
                    ("firstName", first_name),
                    ("lastName", last_name),
                    ("email", email),
                ];
                query.extend(
                    fields
                        .into_iter()
                        .filter(|(_, value)| !value.is_empty())
                        .map(|(key, value)| (key, value.as_str())),
                );
            }
        }

        Ok(self
            .send(self.client.get(self.admin_url(&["users"])?).query(&query))
            .await?
            .json()
            .await?)
    }

    async fn create_user(&self, user: &UserRepresentation) -> Outcome<()> {
        let response = self
            .execute(self.client.post(self.admin_url(&["users"])?).json(user))
            .await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(ServiceError::EmailCollision);
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Outcome<UserRepresentation> {
        Ok(self
            .send(self.client.get(self.admin_url(&["users", id])?))
            .await?
            .json()
            .await?)
    }

    async fn delete_user(&self, id: &str) -> Outcome<()> {
        self.send(self.client.delete(self.admin_url(&["users", id])?))
            .await?;
        Ok(())
    }

    async fn reset_password(
        &self,
        id: &str,
        credential: &CredentialRepresentation,
    ) -> Outcome<()> {
        self.send(
            self.client
                .put(self.admin_url(&["users", id, "reset-password"])?)
                .json(credential),
        )
        .await?;
        Ok(())
    }

    async fn add_realm_roles(&self, user_id: &str, roles: &[RoleRepresentation]) -> Outcome<()> {
        self.send(
            self.client
                .post(self.admin_url(&["users", user_id, "role-mappings", "realm"])?)
                .json(roles),
        )
        .await?;
        Ok(())
    }

    async fn remove_realm_roles(
        &self,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> Outcome<()> {
        self.send(
            self.client
                .delete(self.admin_url(&["users", user_id, "role-mappings", "realm"])?)
                .json(roles),
        )
        .await?;
        Ok(())
    }

    async fn effective_realm_roles(&self, user_id: &str) -> Outcome<Vec<RoleRepresentation>> {
        Ok(self
            .send(self.client.get(self.admin_url(&[
                "users",
                user_id,
                "role-mappings",
                "realm",
                "composite",
            ])?))
            .await?
            .json()
            .await?)
    }

    async fn health_check(&self) -> Outcome<()> {
        self.access_token().await.map(|_| ())
    }
}
