use axum::extract::{Json, State};

use crate::models::RoleTemplate;
use crate::AppState;
use service_core::error::AppError;

/// GET /role-template
pub async fn list_role_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<RoleTemplate>>, AppError> {
    let templates = state
        .templates
        .all()
        .await?
        .into_iter()
        .map(|name| RoleTemplate { name })
        .collect();
    Ok(Json(templates))
}
