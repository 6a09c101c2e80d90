use super::{MeshRbac, ServiceRole, ServiceRoleBinding};
use crate::config::IstioConfig;
use crate::services::endpoint::endpoint;
use crate::services::outcome::{Outcome, ServiceError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SERVICE_ROLES: &str = "serviceroles";
const SERVICE_ROLE_BINDINGS: &str = "servicerolebindings";

#[derive(Debug, Deserialize)]
struct ObjectList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Istio RBAC objects through the Kubernetes API server.
pub struct KubernetesMeshClient {
    config: IstioConfig,
    client: Client,
}

impl KubernetesMeshClient {
    pub fn new(config: IstioConfig) -> Outcome<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

    fn url(&self, resource: &str, name: Option<&str>) -> Outcome<Url> {
        let mut segments = vec![
            "apis",
            "rbac.istio.io",
            "v1alpha1",
            "namespaces",
            self.config.namespace.as_str(),
            resource,
        ];
        segments.extend(name);
        endpoint(&self.config.api_url, &segments)
    }

    fn collection_url(&self, resource: &str) -> Outcome<Url> {
        self.url(resource, None)
    }

    fn object_url(&self, resource: &str, name: &str) -> Outcome<Url> {
        self.url(resource, Some(name))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// The single place API server statuses become [`ServiceError`]s.
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
            "Kubernetes API responded with {} for {}: {}",
            status,
            url,
            body
        )))
    }

    async fn get<T: DeserializeOwned>(&self, resource: &str, name: &str) -> Outcome<T> {
        let response = self
            .authorize(self.client.get(self.object_url(resource, name)?))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete(&self, resource: &str, name: &str) -> Outcome<()> {
        let response = self
            .authorize(self.client.delete(self.object_url(resource, name)?))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// POST, and on conflict PUT over the existing object's resource version.
    async fn create_or_replace<T>(&self, resource: &str, name: &str, object: &T) -> Outcome<()>
    where
        T: Serialize + Sync,
    {
        let response = self
            .authorize(self.client.post(self.collection_url(resource)?))
            .json(object)
            .send()
            .await?;
        if response.status() != StatusCode::CONFLICT {
            Self::check(response).await?;
            return Ok(());
        }

        let existing: serde_json::Value = self.get(resource, name).await?;
        let mut replacement = serde_json::to_value(object)?;
        replacement["metadata"]["resourceVersion"] =
            existing["metadata"]["resourceVersion"].clone();

        tracing::debug!(resource, name, "Object exists, replacing");
        let response = self
            .authorize(self.client.put(self.object_url(resource, name)?))
            .json(&replacement)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl MeshRbac for KubernetesMeshClient {
    async fn get_service_role(&self, name: &str) -> Outcome<ServiceRole> {
        self.get(SERVICE_ROLES, name).await
    }

    async fn list_service_roles(&self, label_selector: &str) -> Outcome<Vec<ServiceRole>> {
        let response = self
            .authorize(self.client.get(self.collection_url(SERVICE_ROLES)?))
            .query(&[("labelSelector", label_selector)])
            .send()
            .await?;
        let list: ObjectList<ServiceRole> = Self::check(response).await?.json().await?;
        Ok(list.items)
    }

    async fn apply_service_role(&self, role: &ServiceRole) -> Outcome<()> {
        self.create_or_replace(SERVICE_ROLES, &role.metadata.name, role)
            .await
    }

    async fn apply_service_role_binding(&self, binding: &ServiceRoleBinding) -> Outcome<()> {
        self.create_or_replace(SERVICE_ROLE_BINDINGS, &binding.metadata.name, binding)
            .await
    }

    async fn delete_service_role(&self, name: &str) -> Outcome<()> {
        self.delete(SERVICE_ROLES, name).await
    }

    async fn delete_service_role_binding(&self, name: &str) -> Outcome<()> {
        self.delete(SERVICE_ROLE_BINDINGS, name).await
    }
}
