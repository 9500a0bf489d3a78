//! Spreadsheet export handler

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Response, StatusCode},
};
use serde::Deserialize;
use tracing::info;

use crate::{get_user_email, parse_kind, AppError, AppState};
use yfcase_core::{export_kind, ExportFormat};

/// Query parameters for export
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Output format: xlsx (default) or csv
    pub format: Option<String>,
}

/// Percent-encode a file name for `Content-Disposition` (RFC 5987 attr-char set)
fn encode_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 3);
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// GET /api/export/:kind - Download every entity of a kind as a spreadsheet
///
/// 404 when the collection is empty.
pub async fn export_entities(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<ExportQuery>,
    headers: HeaderMap,
) -> Result<Response<Body>, AppError> {
    let user_email = get_user_email(&headers);
    let kind = parse_kind(&kind)?;
    let format: ExportFormat = match params.format.as_deref() {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::bad_request("Invalid format. Use 'xlsx' or 'csv'"))?,
        None => ExportFormat::default(),
    };

    let file = {
        let db = state.db.clone();
        tokio::task::spawn_blocking(move || export_kind(&db, kind, format))
            .await?
            .map_err(AppError::core)?
    };

    state.db.log_audit(
        &user_email,
        "export",
        Some(kind.as_str()),
        None,
        Some(&format!("format={}, rows={}", format.extension(), file.rows)),
    )?;

    info!(kind = %kind, rows = file.rows, file_name = %file.file_name, "Export downloaded");

    let encoded = encode_file_name(&file.file_name);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                encoded, encoded
            ),
        )
        .body(Body::from(file.bytes))
        .map_err(|e| AppError::internal(&e.to_string()))
}
