//! User and role assignment handlers.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::dtos::{CreateUserRequest, SearchQuery, TenantQuery};
use crate::models::{Assignment, User};
use crate::AppState;
use service_core::error::AppError;

/// POST /user
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, AppError> {
    req.validate()?;
    let user = state.users.create(&User::from(req)).await?;
    Ok(Json(user))
}

/// Users of one tenant with their roles there.
///
/// GET /user?tenant=
pub async fn list_tenant_users(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    let tenant = query
        .tenant
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing tenant parameter")))?;
    Ok(Json(state.users.list(&tenant).await?))
}

/// GET /user/search
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let search = query.into_search()?;
    Ok(Json(state.users.search(&search).await?))
}

/// GET /user/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.get(&id).await?))
}

/// DELETE /user/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.users.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /user/:id/tenant/:tenant/:role
pub async fn assign_role(
    State(state): State<AppState>,
    Path((id, tenant, role)): Path<(String, String, String)>,
) -> Result<StatusCode, AppError> {
    state.users.assign(&id, &tenant, &role).await?;
    Ok(StatusCode::OK)
}

/// DELETE /user/:id/tenant/:tenant/:role
pub async fn evict_role(
    State(state): State<AppState>,
    Path((id, tenant, role)): Path<(String, String, String)>,
) -> Result<StatusCode, AppError> {
    state.users.evict(&id, &tenant, &role).await?;
    Ok(StatusCode::OK)
}

/// GET /user/:id/tenant
pub async fn user_assignments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    Ok(Json(state.users.assignments(&id).await?))
}
