//! Spreadsheet import handler

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{caller_identity, parse_kind, AppError, AppState, MAX_UPLOAD_SIZE};
use yfcase_core::{import_sheet, BatchResult, SheetFormat};

/// Import result returned to the uploader
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// `匯入完成：成功 N 筆，失敗 M 筆`
    pub message: String,
    pub success: usize,
    pub failed: usize,
    pub created: usize,
    pub updated: usize,
    /// Per-row failures as `第 {line} 行: {reason}` (capped)
    pub errors: Vec<String>,
}

impl From<BatchResult> for ImportResponse {
    fn from(result: BatchResult) -> Self {
        Self {
            message: result.message(),
            success: result.success_count,
            failed: result.failure_count,
            created: result.created,
            updated: result.updated,
            errors: result.errors,
        }
    }
}

/// The `file` part of an import form
struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(String::from);
        let content_type = field.content_type().map(String::from);
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Failed to read file data"))?;

        if bytes.len() > MAX_UPLOAD_SIZE {
            return Err(AppError::bad_request(&format!(
                "檔案過大，上限為 {} MB",
                MAX_UPLOAD_SIZE / 1024 / 1024
            )));
        }

        upload = Some(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    upload.ok_or_else(|| AppError::bad_request("請選擇要匯入的檔案"))
}

/// POST /api/import/:kind - Bulk import users, cities, townships or cases
///
/// Expects multipart form with:
/// - file: xlsx, xls or csv spreadsheet (required, max 10MB)
///
/// Always answers 200 once the sheet is readable, even if every row failed;
/// per-row failures are reported in `errors`.
pub async fn import_entities(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let upload = read_upload(&mut multipart).await?;

    let format = SheetFormat::detect(upload.file_name.as_deref(), upload.content_type.as_deref())
        .ok_or_else(|| {
            warn!(
                file_name = ?upload.file_name,
                content_type = ?upload.content_type,
                "Rejected upload with unsupported type"
            );
            AppError::bad_request("不支援的檔案類型，請上傳 .xlsx, .xls 或 .csv 檔案")
        })?;

    let caller = caller_identity(&state.db, &headers)?;
    let size = upload.bytes.len();

    info!(
        kind = %kind,
        user = %caller.email,
        file_name = ?upload.file_name,
        size,
        "Import started"
    );

    // Rows run sequentially against the pooled store; keep them off the async workers
    let result = {
        let db = state.db.clone();
        let policy = state.config.import_policy.clone();
        let caller = caller.clone();
        tokio::task::spawn_blocking(move || {
            import_sheet(&db, kind, &upload.bytes, format, &caller, &policy)
        })
        .await?
        .map_err(AppError::core)?
    };

    state.db.log_audit(
        &caller.email,
        "import",
        Some(kind.as_str()),
        None,
        Some(
            &serde_json::json!({
                "format": format.extension(),
                "bytes": size,
                "success": result.success_count,
                "failed": result.failure_count,
                "created": result.created,
                "updated": result.updated,
            })
            .to_string(),
        ),
    )?;

    Ok(Json(result.into()))
}
