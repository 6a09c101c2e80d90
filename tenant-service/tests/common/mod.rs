#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tenant_service::config::TenantServiceConfig;
use tenant_service::models::Tenant;
use tenant_service::services::{Outcome, RoleService, ServiceError};
use tenant_service::startup::{AppState, Application};

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub state: AppState,
}

impl TestApp {
    /// Every back-end in memory, on a random port.
    pub async fn spawn() -> Self {
        Self::spawn_with(AppState::in_memory(TenantServiceConfig::for_tests())).await
    }

    pub async fn spawn_with(state: AppState) -> Self {
        let app = Application::with_state(state)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let state = app.state();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        Self {
            address,
            port,
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// One recorded role operation: `(operation, tenant, template)`.
pub type Call = (String, String, String);

/// Role back-end that records every call and fails on chosen templates.
#[derive(Default)]
pub struct RecordingRoleService {
    name: String,
    calls: Mutex<Vec<Call>>,
    failing: HashSet<String>,
}

impl RecordingRoleService {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    pub fn failing_on(name: &str, templates: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            failing: templates.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }

    fn record(&self, operation: &str, tenant: &str, template: &str) -> Outcome<()> {
        self.calls.lock().unwrap().push((
            operation.to_string(),
            tenant.to_string(),
            template.to_string(),
        ));
        if self.failing.contains(template) {
            return Err(ServiceError::message(format!(
                "{} rejected {}",
                self.name, template
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleService for RecordingRoleService {
    fn backend(&self) -> &str {
        &self.name
    }

    async fn apply(&self, tenant: &Tenant, template: &str) -> Outcome<()> {
        self.record("apply", &tenant.name, template)
    }

    async fn delete(&self, tenant: &str, template: &str) -> Outcome<()> {
        self.record("delete", tenant, template)
    }
}
