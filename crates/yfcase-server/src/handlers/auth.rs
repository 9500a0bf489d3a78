//! Authentication-related handlers

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;

use crate::{caller_identity, AppError, AppState};
use yfcase_core::models::Role;

/// Response for the /api/me endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    /// The authenticated user's email or identifier
    pub user: String,
    /// How the user was authenticated
    pub auth_method: &'static str,
    /// Stored user the caller resolves to; cases created without a
    /// responsible person are assigned to it
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub role: Option<Role>,
}

/// GET /api/me - The resolved caller identity
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let caller = caller_identity(&state.db, &headers)?;

    let auth_method = match caller.email.as_str() {
        "api-key" => "api_key",
        "local-dev" => "none",
        _ => "identity_header",
    };

    let user = match caller.user_id {
        Some(id) => state.db.get_user(id).map_err(AppError::core)?,
        None => None,
    };

    Ok(Json(MeResponse {
        user: caller.email,
        auth_method,
        user_id: caller.user_id,
        name: user.as_ref().map(|u| u.name.clone()),
        role: user.map(|u| u.role),
    }))
}
