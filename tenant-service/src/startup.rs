//! Application startup and lifecycle management.
//!
//! Back-ends are chosen from configuration: a disabled back-end is replaced by
//! its in-memory counterpart so the service runs without external systems.

use crate::config::TenantServiceConfig;
use crate::handlers::{self, context, role_template, tenant, user};
use crate::services::bootstrap::bootstrap_operator;
use crate::services::{
    log_failure, DataPartition, IdentityProvider, InMemoryIdentity, InMemoryMesh, IstioRole,
    KeycloakClient, KeycloakRole, KubernetesMeshClient, MeshRbac, MongoPartition, NoopPartition,
    RoleService, RoleTemplateProvider, StaticRoleTemplates, TenantService, UserService,
};
use axum::{
    body::Body,
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::{make_request_span, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: TenantServiceConfig,
    pub tenants: TenantService,
    pub users: UserService,
    pub templates: Arc<dyn RoleTemplateProvider>,
    pub identity: Arc<dyn IdentityProvider>,
    pub partition: Arc<dyn DataPartition>,
}

impl AppState {
    pub fn new(
        config: TenantServiceConfig,
        identity: Arc<dyn IdentityProvider>,
        backends: Vec<Arc<dyn RoleService>>,
        templates: Arc<dyn RoleTemplateProvider>,
        partition: Arc<dyn DataPartition>,
    ) -> Self {
        let tenants = TenantService::new(
            identity.clone(),
            backends,
            templates.clone(),
            partition.clone(),
        );
        let users = UserService::new(identity.clone(), templates.clone());
        Self {
            config,
            tenants,
            users,
            templates,
            identity,
            partition,
        }
    }

    /// Connects the back-ends enabled in `config`.
    pub async fn connect(config: TenantServiceConfig) -> Result<Self, AppError> {
        let identity: Arc<dyn IdentityProvider> = if config.keycloak.enabled {
            let keycloak = KeycloakClient::new(config.keycloak.clone())?;
            keycloak.ensure_realm().await.map_err(|e| {
                tracing::error!(realm = %keycloak.realm(), "Failed to prepare realm: {}", e);
                AppError::from(e)
            })?;
            keycloak.ensure_client().await.map_err(|e| {
                tracing::error!(client = %config.keycloak.client, "Failed to register client: {}", e);
                AppError::from(e)
            })?;
            tracing::info!(realm = %keycloak.realm(), "Keycloak identity back-end initialized");
            Arc::new(keycloak)
        } else {
            tracing::info!("Keycloak disabled, using in-memory identity back-end");
            Arc::new(InMemoryIdentity::new())
        };

        let catalog = &config.tenant.role_templates;
        let mesh: Arc<dyn MeshRbac> = if config.istio.enabled {
            tracing::info!(namespace = %config.istio.namespace, "Istio mesh back-end initialized");
            Arc::new(KubernetesMeshClient::new(config.istio.clone())?)
        } else {
            tracing::info!("Istio disabled, using in-memory mesh with configured role templates");
            Arc::new(InMemoryMesh::with_catalog(catalog.iter().cloned()))
        };

        let istio = Arc::new(IstioRole::new(mesh));
        // The mesh catalog is authoritative once the mesh is real.
        let templates: Arc<dyn RoleTemplateProvider> = if config.istio.enabled {
            istio.clone()
        } else {
            Arc::new(StaticRoleTemplates::new(catalog.iter().cloned()))
        };
        let backends: Vec<Arc<dyn RoleService>> =
            vec![Arc::new(KeycloakRole::new(identity.clone())), istio];

        let partition: Arc<dyn DataPartition> = if config.mongodb.enabled {
            Arc::new(MongoPartition::connect(&config.mongodb.uri).await?)
        } else {
            tracing::info!("MongoDB disabled, tenant data is not purged");
            Arc::new(NoopPartition::new())
        };

        Ok(Self::new(config, identity, backends, templates, partition))
    }

    /// Every back-end in memory.
    pub fn in_memory(config: TenantServiceConfig) -> Self {
        let identity: Arc<dyn IdentityProvider> = Arc::new(InMemoryIdentity::new());
        let mesh = Arc::new(InMemoryMesh::with_catalog(
            config.tenant.role_templates.iter().cloned(),
        ));
        let templates: Arc<dyn RoleTemplateProvider> = Arc::new(StaticRoleTemplates::new(
            config.tenant.role_templates.iter().cloned(),
        ));
        let backends: Vec<Arc<dyn RoleService>> = vec![
            Arc::new(KeycloakRole::new(identity.clone())),
            Arc::new(IstioRole::new(mesh)),
        ];
        Self::new(
            config,
            identity,
            backends,
            templates,
            Arc::new(NoopPartition::new()),
        )
    }
}

/// The HTTP surface.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/tenant",
            get(tenant::list_tenants).post(tenant::create_tenant),
        )
        .route(
            "/tenant/:name",
            get(tenant::get_tenant)
                .patch(tenant::patch_tenant)
                .delete(tenant::delete_tenant),
        )
        .route(
            "/user",
            get(user::list_tenant_users).post(user::create_user),
        )
        .route("/user/search", get(user::search_users))
        .route("/user/:id", get(user::get_user).delete(user::delete_user))
        .route("/user/:id/tenant", get(user::user_assignments))
        .route(
            "/user/:id/tenant/:tenant/:role",
            put(user::assign_role).delete(user::evict_role),
        )
        .route("/context", get(context::get_context))
        .route("/context/tenant", post(context::create_and_assign))
        .route("/role-template", get(role_template::list_role_templates))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: TenantServiceConfig) -> Result<Self, AppError> {
        let state = AppState::connect(config).await?;
        Self::with_state(state).await
    }

    /// Bind a listener for an already assembled state.
    pub async fn with_state(state: AppState) -> Result<Self, AppError> {
        // Port 0 binds a random port for tests
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();
        tracing::info!("Tenant service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve until a shutdown signal arrives.
    ///
    /// The operator account, when configured, is provisioned in the
    /// background so a slow identity back-end does not delay startup.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        if let Some(initial) = self.state.config.initial_user.clone() {
            let identity = self.state.identity.clone();
            let users = self.state.users.clone();
            tokio::spawn(async move {
                if let Err(e) = bootstrap_operator(identity, &users, &initial).await {
                    log_failure(&e, "Operator bootstrap failed");
                }
            });
        }

        let router = build_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
