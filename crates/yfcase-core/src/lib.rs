//! yfcase Core Library
//!
//! Shared functionality for the yfcase case-management service:
//! - Database access and migrations (users, cities, townships, cases, audit log)
//! - Spreadsheet reading and writing (xlsx, xls, CSV)
//! - Bulk import engine with per-row reconciliation and failure reporting
//! - Spreadsheet export with denormalised reference columns

pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod sheet;
pub mod store;

pub use db::{AuditEntry, Database, TableCounts};
pub use error::{Error, Result};
pub use export::{export_kind, export_table, ExportFile, ExportFormat};
pub use import::{
    hash_password, import_rows, import_sheet, BatchResult, ImportPolicy, RowError, RowOutcome,
};
pub use models::{CallerIdentity, EntityKind};
pub use sheet::{read_sheet, Cell, Row, SheetFormat, SheetTable};
pub use store::EntityStore;
