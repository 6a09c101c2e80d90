//! Caller context handlers.
//!
//! The bearer token is only read for its subject. Signature and expiry are
//! checked by the identity back-end and the mesh in front of this service.

use axum::{
    extract::{Json, State},
    http::{header::AUTHORIZATION, HeaderMap},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use validator::Validate;

use crate::dtos::TenantRequest;
use crate::models::{SecurityContext, Tenant};
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
struct SubjectClaims {
    sub: String,
}

/// Subject of the `Authorization` header's token.
pub fn caller_id(headers: &HeaderMap) -> Result<String, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Authorization header is missing")))?
        .to_str()
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Authorization header is not valid")))?;
    let token = header
        .split_once(' ')
        .map(|(_, token)| token)
        .unwrap_or(header);

    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let claims = decode::<SubjectClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(claims.claims.sub)
}

/// The caller and the tenants it holds roles in.
///
/// GET /context
pub async fn get_context(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SecurityContext>, AppError> {
    let user_id = caller_id(&headers)?;
    let user = state.users.get(&user_id).await?;

    let mut tenants = Vec::new();
    for assignment in state.users.assignments(&user_id).await? {
        // Roles may outlive their tenant's group.
        if let Ok(tenant) = state.tenants.get(&assignment.tenant).await {
            tenants.push(tenant);
        }
    }

    Ok(Json(SecurityContext { user, tenants }))
}

/// Create a tenant and grant the caller the default role in it.
///
/// POST /context/tenant
pub async fn create_and_assign(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TenantRequest>,
) -> Result<Json<Tenant>, AppError> {
    let user_id = caller_id(&headers)?;
    req.validate()?;

    let tenant = state.tenants.create(&req.into_tenant()).await?;
    state
        .users
        .assign(&user_id, &tenant.name, &state.config.tenant.default_role)
        .await?;

    tracing::info!(tenant = %tenant.name, user_id = %user_id, "Tenant created for caller");
    Ok(Json(tenant))
}
