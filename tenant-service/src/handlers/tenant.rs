//! Tenant lifecycle handlers.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::dtos::TenantRequest;
use crate::models::Tenant;
use crate::AppState;
use service_core::error::AppError;

/// GET /tenant
pub async fn list_tenants(State(state): State<AppState>) -> Result<Json<Vec<Tenant>>, AppError> {
    Ok(Json(state.tenants.list().await?))
}

/// Create a tenant and provision its roles on every back-end.
///
/// POST /tenant
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(req): Json<TenantRequest>,
) -> Result<Json<Tenant>, AppError> {
    req.validate()?;
    let tenant = state.tenants.create(&req.into_tenant()).await?;
    Ok(Json(tenant))
}

/// GET /tenant/:name
pub async fn get_tenant(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Tenant>, AppError> {
    Ok(Json(state.tenants.get(&name).await?))
}

/// Update display metadata. The name in the path wins over the body.
///
/// PATCH /tenant/:name
pub async fn patch_tenant(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<TenantRequest>,
) -> Result<Json<Tenant>, AppError> {
    req.validate()?;
    let tenant = state.tenants.save(&req.into_tenant_named(&name)).await?;
    Ok(Json(tenant))
}

/// DELETE /tenant/:name
pub async fn delete_tenant(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.tenants.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
