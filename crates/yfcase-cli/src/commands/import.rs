//! Import and export command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use yfcase_core::{
    db::Database, export_kind, import_sheet, BatchResult, CallerIdentity, ExportFormat,
    ImportPolicy, SheetFormat,
};

use super::parse_kind;

/// Identity recorded for imports run without `--as`
pub const CLI_IDENTITY: &str = "cli";

/// Resolve the identity an import runs as
fn cli_caller(db: &Database, as_email: Option<&str>) -> Result<CallerIdentity> {
    match as_email {
        Some(email) => {
            let email = email.trim().to_lowercase();
            let user = db
                .find_user_by_email(&email)?
                .with_context(|| format!("No user with email {}", email))?;
            Ok(CallerIdentity::new(email, Some(user.id)))
        }
        None => Ok(CallerIdentity::new(CLI_IDENTITY, None)),
    }
}

pub fn cmd_import(
    db: &Database,
    kind: &str,
    file: &Path,
    as_email: Option<&str>,
) -> Result<BatchResult> {
    let kind = parse_kind(kind)?;
    let file_name = file.file_name().and_then(|n| n.to_str());
    let format = SheetFormat::detect(file_name, None).ok_or_else(|| {
        anyhow::anyhow!("Unsupported file type: use a .xlsx, .xls or .csv file")
    })?;

    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let caller = cli_caller(db, as_email)?;
    let policy = ImportPolicy::from_env();

    println!("📥 Importing {} from {}...", kind, file.display());

    let result = import_sheet(db, kind, &bytes, format, &caller, &policy)?;

    db.log_audit(
        &caller.email,
        "import",
        Some(kind.as_str()),
        None,
        Some(&format!("file={}", file.display())),
    )?;

    println!("✅ {}", result.message());
    println!("   Created: {}", result.created);
    println!("   Updated: {}", result.updated);
    if !result.errors.is_empty() {
        println!();
        println!("   Failed rows:");
        for error in &result.errors {
            println!("   - {}", error);
        }
        if result.failure_count > result.errors.len() {
            println!(
                "   ... and {} more",
                result.failure_count - result.errors.len()
            );
        }
    }

    Ok(result)
}

pub fn cmd_export(
    db: &Database,
    kind: &str,
    output: Option<&Path>,
    format: &str,
) -> Result<PathBuf> {
    let kind = parse_kind(kind)?;
    let format: ExportFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let file = export_kind(db, kind, format)?;
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&file.file_name));

    std::fs::write(&path, &file.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    db.log_audit(
        CLI_IDENTITY,
        "export",
        Some(kind.as_str()),
        None,
        Some(&format!("format={}, rows={}", format.extension(), file.rows)),
    )?;
    info!(kind = %kind, rows = file.rows, path = %path.display(), "Export written");

    println!("✅ Exported {} {} to {}", file.rows, kind, path.display());

    Ok(path)
}
