//! Reference list handlers (cities, townships, users)

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use yfcase_core::models::{City, TownshipWithCity, User};

/// GET /api/cities - All cities, by name
pub async fn list_cities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<City>>, AppError> {
    let cities = state.db.list_cities().map_err(AppError::core)?;
    Ok(Json(cities))
}

/// Query parameters for listing townships
#[derive(Debug, Deserialize)]
pub struct TownshipQuery {
    /// Only townships of this city
    pub city_id: Option<i64>,
}

/// GET /api/townships - Townships with their city name, optionally for one city
pub async fn list_townships(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TownshipQuery>,
) -> Result<Json<Vec<TownshipWithCity>>, AppError> {
    let townships = state
        .db
        .list_townships(params.city_id)
        .map_err(AppError::core)?;
    Ok(Json(townships))
}

/// GET /api/users - All staff accounts (credential fields are never serialized)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = state.db.list_users().map_err(AppError::core)?;
    Ok(Json(users))
}
