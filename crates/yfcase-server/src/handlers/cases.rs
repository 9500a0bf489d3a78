//! Case management handlers
//!
//! Create and update go through the same reference resolution as a
//! spreadsheet row, with every reference given by identifier.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::{caller_identity, get_user_email, AppError, AppState, SuccessResponse};
use yfcase_core::import::{check_case_lengths, resolve_case_ids, Responsible};
use yfcase_core::models::{CaseFields, CaseWithRefs};
use yfcase_core::RowError;

/// Maximum JSON body for case create/update
const MAX_CASE_BODY: usize = 64 * 1024;

async fn read_case_fields(request: Request) -> Result<CaseFields, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_CASE_BODY)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let fields: CaseFields =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;
    Ok(fields)
}

/// Lookup and length failures are the client's fault
fn reference_error(err: RowError) -> AppError {
    match err {
        RowError::ReferenceNotFound { target, .. } => {
            AppError::bad_request(&format!("找不到指定的{}", target))
        }
        RowError::UnhandledStoreError(msg) => AppError::internal(&msg),
        other => AppError::bad_request(&other.to_string()),
    }
}

/// Trim the case number the way an imported row is trimmed
fn trim_case_number(fields: &mut CaseFields) {
    if let Some(number) = fields.case_number.as_mut() {
        *number = number.trim().to_string();
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn load_case(state: &AppState, id: i64) -> Result<CaseWithRefs, AppError> {
    state
        .db
        .get_case_with_refs(id)
        .map_err(AppError::core)?
        .ok_or_else(|| AppError::not_found("找不到該案件"))
}

/// GET /api/cases - List all cases, newest first
pub async fn list_cases(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CaseWithRefs>>, AppError> {
    let cases = state.db.list_cases().map_err(AppError::core)?;
    Ok(Json(cases))
}

/// GET /api/cases/:id - Get a case with its city, township and responsible person
pub async fn get_case(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CaseWithRefs>, AppError> {
    Ok(Json(load_case(&state, id)?))
}

/// POST /api/cases - Create a case
///
/// Without `userId` the caller becomes the responsible person.
pub async fn create_case(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<CaseWithRefs>), AppError> {
    let caller = caller_identity(&state.db, request.headers())?;
    let mut fields = read_case_fields(request).await?;
    trim_case_number(&mut fields);

    if blank(&fields.case_number) {
        return Err(AppError::bad_request("請輸入案號"));
    }

    let refs = resolve_case_ids(&state.db, fields.city_id, fields.township_id, fields.user_id)
        .map_err(reference_error)?;
    check_case_lengths(&fields).map_err(reference_error)?;
    let user_id = match refs.responsible {
        Responsible::Explicit(user_id) => user_id,
        Responsible::Caller => caller
            .user_id
            .ok_or_else(|| AppError::bad_request("找不到指定的負責人"))?,
    };

    fields.city_id = refs.city_id;
    fields.township_id = refs.township_id;
    fields.user_id = Some(user_id);

    let id = state.db.create_case(&fields).map_err(AppError::core)?;

    state.db.log_audit(
        &caller.email,
        "create",
        Some("case"),
        Some(id),
        fields.case_number.as_deref(),
    )?;
    info!(id, user = %caller.email, "Case created");

    Ok((StatusCode::CREATED, Json(load_case(&state, id)?)))
}

/// PUT /api/cases/:id - Sparse update; omitted fields keep their stored values
pub async fn update_case(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<CaseWithRefs>, AppError> {
    let user_email = get_user_email(request.headers());
    let mut fields = read_case_fields(request).await?;
    trim_case_number(&mut fields);

    if state.db.get_case(id).map_err(AppError::core)?.is_none() {
        return Err(AppError::not_found("找不到該案件"));
    }
    if fields.case_number.is_some() && blank(&fields.case_number) {
        return Err(AppError::bad_request("請輸入案號"));
    }

    let refs = resolve_case_ids(&state.db, fields.city_id, fields.township_id, fields.user_id)
        .map_err(reference_error)?;
    check_case_lengths(&fields).map_err(reference_error)?;

    fields.city_id = refs.city_id;
    fields.township_id = refs.township_id;
    // Omitted responsible person keeps the stored one
    fields.user_id = match refs.responsible {
        Responsible::Explicit(user_id) => Some(user_id),
        Responsible::Caller => None,
    };

    state.db.update_case(id, &fields).map_err(AppError::core)?;

    state
        .db
        .log_audit(&user_email, "update", Some("case"), Some(id), None)?;

    Ok(Json(load_case(&state, id)?))
}

/// DELETE /api/cases/:id - Hard delete
pub async fn delete_case(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(request.headers());

    if !state.db.delete_case(id).map_err(AppError::core)? {
        return Err(AppError::not_found("找不到該案件"));
    }

    state
        .db
        .log_audit(&user_email, "delete", Some("case"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
