//! Batch driver: runs every row through the pipeline in file order

use serde::Serialize;
use tracing::{debug, info, warn};

use super::normalize::{normalize, Draft};
use super::resolve::{resolve_case_refs, resolve_township_city};
use super::upsert::{upsert_case, upsert_city, upsert_township, upsert_user, RowOutcome};
use super::validate::{check_lengths, check_required};
use super::{ImportPolicy, RowError};
use crate::error::{Error, Result};
use crate::models::{CallerIdentity, EntityKind};
use crate::sheet::{read_sheet, Row, SheetFormat};
use crate::store::EntityStore;

/// Error messages kept in a batch result; counters stay exact beyond this
pub const MAX_REPORTED_ERRORS: usize = 50;

/// Aggregated outcome of one import batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub created: usize,
    pub updated: usize,
    /// `第 {line} 行: {reason}`, in row order, at most `MAX_REPORTED_ERRORS`
    pub errors: Vec<String>,
}

impl BatchResult {
    /// Summary line shown to the uploader
    pub fn message(&self) -> String {
        format!(
            "匯入完成：成功 {} 筆，失敗 {} 筆",
            self.success_count, self.failure_count
        )
    }

    fn record_success(&mut self, outcome: RowOutcome) {
        self.success_count += 1;
        match outcome {
            RowOutcome::Created(_) => self.created += 1,
            RowOutcome::Updated(_) => self.updated += 1,
        }
    }

    fn record_failure(&mut self, line: usize, error: &RowError) {
        self.failure_count += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(format!("第 {} 行: {}", line, error));
        }
    }
}

fn process_row<S: EntityStore + ?Sized>(
    store: &S,
    draft: &Draft,
    caller: &CallerIdentity,
    policy: &ImportPolicy,
) -> std::result::Result<RowOutcome, RowError> {
    check_required(draft)?;

    match draft {
        Draft::User(d) => {
            check_lengths(draft)?;
            upsert_user(store, d, policy)
        }
        Draft::City(d) => {
            check_lengths(draft)?;
            upsert_city(store, d)
        }
        Draft::Township(d) => {
            let city = resolve_township_city(store, d)?;
            check_lengths(draft)?;
            upsert_township(store, d, &city)
        }
        Draft::Case(d) => {
            let refs = resolve_case_refs(store, d)?;
            check_lengths(draft)?;
            upsert_case(store, d, &refs, caller)
        }
    }
}

/// Import already-parsed rows of one entity kind.
///
/// Rows are processed sequentially and independently; there is no
/// cross-row transaction. Fails only when there are no rows at all.
pub fn import_rows<S: EntityStore + ?Sized>(
    store: &S,
    kind: EntityKind,
    rows: &[Row],
    caller: &CallerIdentity,
    policy: &ImportPolicy,
) -> Result<BatchResult> {
    if rows.is_empty() {
        return Err(Error::EmptySheet);
    }

    let mut result = BatchResult::default();

    for row in rows {
        let draft = normalize(row, kind);
        match process_row(store, &draft, caller, policy) {
            Ok(outcome) => {
                debug!(kind = %kind, line = row.line, ?outcome, "Row imported");
                result.record_success(outcome);
            }
            Err(e) => {
                debug!(kind = %kind, line = row.line, error = %e, "Row rejected");
                result.record_failure(row.line, &e);
            }
        }
    }

    if kind == EntityKind::User && result.created > 0 && policy.uses_builtin_password() {
        warn!(
            created = result.created,
            "Imported users were given the built-in default password; set {} to change it",
            ImportPolicy::PASSWORD_ENV
        );
    }

    info!(
        kind = %kind,
        rows = rows.len(),
        success = result.success_count,
        failed = result.failure_count,
        created = result.created,
        updated = result.updated,
        "Import batch finished"
    );

    Ok(result)
}

/// Parse an uploaded sheet and import it
pub fn import_sheet<S: EntityStore + ?Sized>(
    store: &S,
    kind: EntityKind,
    bytes: &[u8],
    format: SheetFormat,
    caller: &CallerIdentity,
    policy: &ImportPolicy,
) -> Result<BatchResult> {
    let rows = read_sheet(bytes, format)?;
    import_rows(store, kind, &rows, caller, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::sheet::Cell;

    fn city_row(line: usize, name: &str) -> Row {
        Row::new(line, vec![("城市名稱".to_string(), Cell::String(name.to_string()))])
    }

    fn caller() -> CallerIdentity {
        CallerIdentity::new("admin@example.com", None)
    }

    #[test]
    fn test_empty_batch_is_fatal() {
        let db = Database::in_memory().unwrap();
        let result = import_rows(&db, EntityKind::City, &[], &caller(), &ImportPolicy::default());
        assert!(matches!(result, Err(Error::EmptySheet)));
    }

    #[test]
    fn test_error_list_is_capped_but_counters_exact() {
        let db = Database::in_memory().unwrap();
        let rows: Vec<Row> = (0..60)
            .map(|i| Row::new(i + 2, vec![("城市名稱".to_string(), Cell::Empty)]))
            .chain(std::iter::once(city_row(62, "台北市")))
            .collect();

        let result =
            import_rows(&db, EntityKind::City, &rows, &caller(), &ImportPolicy::default()).unwrap();

        assert_eq!(result.failure_count, 60);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.errors.len(), MAX_REPORTED_ERRORS);
        assert_eq!(result.errors[0], "第 2 行: 缺少必填字段（城市名稱）");
        assert_eq!(result.message(), "匯入完成：成功 1 筆，失敗 60 筆");
    }

    #[test]
    fn test_rows_are_independent_and_ordered() {
        let db = Database::in_memory().unwrap();
        let rows = vec![
            city_row(2, "台北市"),
            city_row(3, "台北市"),
            city_row(4, "新北市"),
        ];

        let result =
            import_rows(&db, EntityKind::City, &rows, &caller(), &ImportPolicy::default()).unwrap();

        // The second row collides with the city the first row created
        assert_eq!(result.created, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.errors, vec!["第 3 行: 城市名稱 \"台北市\" 已存在"]);
        assert_eq!(db.list_cities().unwrap().len(), 2);
    }
}
