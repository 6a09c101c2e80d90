use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use tenant_service::config::IstioConfig;
use tenant_service::models::Tenant;
use tenant_service::services::mesh::ServiceRoleBinding;
use tenant_service::services::{
    IstioRole, KubernetesMeshClient, MeshRbac, RoleService, RoleTemplateProvider, ServiceError,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROLES: &str = "/apis/rbac.istio.io/v1alpha1/namespaces/tenants/serviceroles";
const BINDINGS: &str = "/apis/rbac.istio.io/v1alpha1/namespaces/tenants/servicerolebindings";

async fn mesh() -> (MockServer, KubernetesMeshClient) {
    let server = MockServer::start().await;
    let client = KubernetesMeshClient::new(IstioConfig {
        api_url: server.uri(),
        namespace: "tenants".to_string(),
        token: Some(SecretString::new("sa-token".to_string())),
        enabled: true,
    })
    .expect("Failed to build mesh client");
    (server, client)
}

fn catalog_role(name: &str) -> serde_json::Value {
    json!({
        "apiVersion": "rbac.istio.io/v1alpha1",
        "kind": "ServiceRole",
        "metadata": {
            "name": name,
            "labels": { "type": "tenant-template" },
            "resourceVersion": "17"
        },
        "spec": {
            "rules": [{ "services": ["*"], "paths": ["/{tenant}/reports/*"], "methods": ["GET"] }]
        }
    })
}

#[tokio::test]
async fn catalog_is_listed_by_label() {
    let (server, client) = mesh().await;
    Mock::given(method("GET"))
        .and(path(ROLES))
        .and(query_param("labelSelector", "type=tenant-template"))
        .and(header("authorization", "Bearer sa-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [catalog_role("analyst"), catalog_role("auditor")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let templates = IstioRole::new(Arc::new(client)).all().await.unwrap();

    assert_eq!(templates, vec!["analyst", "auditor"]);
}

#[tokio::test]
async fn existing_binding_is_replaced_with_its_resource_version() {
    let (server, client) = mesh().await;
    Mock::given(method("POST"))
        .and(path(BINDINGS))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/t1.analyst", BINDINGS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": { "name": "t1.analyst", "resourceVersion": "42" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/t1.analyst", BINDINGS)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .apply_service_role_binding(&ServiceRoleBinding::for_role("t1.analyst", "t1"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|request| request.method.to_string() == "PUT")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(body["metadata"]["resourceVersion"], "42");
}

#[tokio::test]
async fn apply_instantiates_catalog_role() {
    let (server, client) = mesh().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/analyst", ROLES)))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_role("analyst")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ROLES))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(BINDINGS))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    IstioRole::new(Arc::new(client))
        .apply(&Tenant::new("t1", "Team", ""), "analyst")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let created = requests
        .iter()
        .find(|request| request.method.to_string() == "POST" && request.url.path() == ROLES)
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&created.body).unwrap();
    assert_eq!(body["metadata"]["name"], "t1.analyst");
    assert!(body["metadata"].get("labels").is_none());
    assert!(body["metadata"].get("resourceVersion").is_none());
    assert_eq!(body["spec"]["rules"][0]["paths"][0], "/t1/reports/*");
}

#[tokio::test]
async fn deleting_missing_objects_succeeds() {
    let (server, client) = mesh().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/t1.analyst", ROLES)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/t1.analyst", BINDINGS)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    IstioRole::new(Arc::new(client))
        .delete("t1", "analyst")
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_role_is_not_found() {
    let (server, client) = mesh().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/ghost", ROLES)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(matches!(
        client.get_service_role("ghost").await,
        Err(ServiceError::NotFound)
    ));
}

#[tokio::test]
async fn role_name_is_a_single_path_segment() {
    let (server, client) = mesh().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/..%2F..%2Fsecrets%2Ftoken.admin", ROLES)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/..%2F..%2Fsecrets%2Ftoken.admin", BINDINGS)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    IstioRole::new(Arc::new(client))
        .delete("../../secrets/token", "admin")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|request| {
        let path = request.url.path();
        path.starts_with(ROLES) || path.starts_with(BINDINGS)
    }));
}

#[tokio::test]
async fn dot_segment_role_is_not_found() {
    let (server, client) = mesh().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert!(matches!(
        client.get_service_role("..").await,
        Err(ServiceError::NotFound)
    ));
}
