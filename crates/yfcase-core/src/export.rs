//! Export of one entity kind to a flat spreadsheet
//!
//! Every entity becomes one row: its own ID first, scalar fields in a fixed
//! order, and for each reference both an ID column and a display-name column.
//! Enumerations render as display labels and booleans as 是/否, so an
//! unmodified export re-imports as a no-op update.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Error, Result};
use crate::models::{bool_label, CaseWithRefs, City, EntityKind, TownshipWithCity, User};
use crate::sheet::{write_csv, write_xlsx, Column, SheetTable};
use crate::store::EntityStore;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

const USER_COLUMNS: &[Column] = &[
    Column::new("ID", 30.0),
    Column::new("姓名", 15.0),
    Column::new("電子郵件", 25.0),
    Column::new("暱稱", 15.0),
    Column::new("身份證字號", 15.0),
    Column::new("電話", 15.0),
    Column::new("手機", 15.0),
    Column::new("權限", 15.0),
    Column::new("工作轄區", 15.0),
    Column::new("身份類型", 12.0),
    Column::new("生日", 15.0),
    Column::new("縣市", 12.0),
    Column::new("區", 12.0),
    Column::new("里", 12.0),
    Column::new("鄰", 10.0),
    Column::new("街道", 20.0),
    Column::new("段", 10.0),
    Column::new("巷", 10.0),
    Column::new("弄", 10.0),
    Column::new("號", 10.0),
    Column::new("樓層", 10.0),
    Column::new("已驗證", 10.0),
    Column::new("已登入", 10.0),
    Column::new("建立時間", 20.0),
    Column::new("更新時間", 20.0),
];

const CITY_COLUMNS: &[Column] = &[
    Column::new("ID", 30.0),
    Column::new("城市名稱", 20.0),
    Column::new("建立時間", 20.0),
    Column::new("更新時間", 20.0),
];

const TOWNSHIP_COLUMNS: &[Column] = &[
    Column::new("ID", 30.0),
    Column::new("城市", 15.0),
    Column::new("城市ID", 30.0),
    Column::new("鄉鎮名稱", 20.0),
    Column::new("郵遞區號", 12.0),
    Column::new("地方法院", 20.0),
    Column::new("地政事務所", 20.0),
    Column::new("財政稅務局", 20.0),
    Column::new("警察局", 15.0),
    Column::new("國稅局", 15.0),
    Column::new("戶政事務所", 20.0),
    Column::new("建立時間", 20.0),
    Column::new("更新時間", 20.0),
];

const CASE_COLUMNS: &[Column] = &[
    Column::new("ID", 30.0),
    Column::new("案號", 30.0),
    Column::new("公司", 20.0),
    Column::new("城市", 15.0),
    Column::new("城市ID", 30.0),
    Column::new("鄉鎮里區", 20.0),
    Column::new("鄉鎮里區ID", 30.0),
    Column::new("大段", 10.0),
    Column::new("小段", 10.0),
    Column::new("里", 15.0),
    Column::new("鄰", 10.0),
    Column::new("街道", 20.0),
    Column::new("段", 10.0),
    Column::new("巷", 10.0),
    Column::new("弄", 10.0),
    Column::new("號", 10.0),
    Column::new("樓層", 10.0),
    Column::new("狀態", 10.0),
    Column::new("負責人", 15.0),
    Column::new("負責人ID", 30.0),
    Column::new("負責人Email", 25.0),
    Column::new("建立時間", 20.0),
    Column::new("更新時間", 20.0),
];

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_id(value: Option<i64>) -> String {
    value.map(|id| id.to_string()).unwrap_or_default()
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y/%-m/%-d").to_string())
        .unwrap_or_default()
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y/%-m/%-d %H:%M:%S").to_string()
}

fn user_row(user: &User) -> Vec<String> {
    let a = &user.address;
    vec![
        user.id.to_string(),
        user.name.clone(),
        user.email.clone(),
        opt(&user.nickname),
        opt(&user.personal_id),
        opt(&user.phone),
        opt(&user.mobile),
        user.role.label().to_string(),
        user.work_area.map(|w| w.label()).unwrap_or_default().to_string(),
        user.identity_type
            .map(|t| t.label())
            .unwrap_or_default()
            .to_string(),
        format_date(user.birthday),
        opt(&a.city),
        opt(&a.district),
        opt(&a.village),
        opt(&a.neighbor),
        opt(&a.street),
        opt(&a.section),
        opt(&a.lane),
        opt(&a.alley),
        opt(&a.number),
        opt(&a.floor),
        bool_label(user.is_verified).to_string(),
        bool_label(user.is_logged_in).to_string(),
        format_timestamp(&user.created_at),
        format_timestamp(&user.updated_at),
    ]
}

fn city_row(city: &City) -> Vec<String> {
    vec![
        city.id.to_string(),
        city.name.clone(),
        format_timestamp(&city.created_at),
        format_timestamp(&city.updated_at),
    ]
}

fn township_row(entry: &TownshipWithCity) -> Vec<String> {
    let t = &entry.township;
    let o = &t.offices;
    vec![
        t.id.to_string(),
        opt(&entry.city_name),
        t.city_id.to_string(),
        t.name.clone(),
        opt(&o.zip_code),
        opt(&o.district_court),
        opt(&o.land_office),
        opt(&o.finance_and_tax_bureau),
        opt(&o.police_station),
        opt(&o.irs),
        opt(&o.home_office),
        format_timestamp(&t.created_at),
        format_timestamp(&t.updated_at),
    ]
}

fn case_row(entry: &CaseWithRefs) -> Vec<String> {
    let c = &entry.case;
    let l = &c.land;
    let user = entry.user.as_ref();
    vec![
        c.id.to_string(),
        c.case_number.clone(),
        opt(&c.company),
        opt(&entry.city_name),
        opt_id(c.city_id),
        opt(&entry.township_name),
        opt_id(c.township_id),
        opt(&l.big_section),
        opt(&l.small_section),
        opt(&l.village),
        opt(&l.neighbor),
        opt(&l.street),
        opt(&l.section),
        opt(&l.lane),
        opt(&l.alley),
        opt(&l.number),
        opt(&l.floor),
        opt(&c.status),
        user.map(|u| u.display_name().to_string()).unwrap_or_default(),
        user.map(|u| u.id.to_string()).unwrap_or_default(),
        user.map(|u| u.email.clone()).unwrap_or_default(),
        format_timestamp(&c.created_at),
        format_timestamp(&c.updated_at),
    ]
}

/// Read every entity of a kind and flatten it into a table
pub fn export_table<S: EntityStore + ?Sized>(store: &S, kind: EntityKind) -> Result<SheetTable> {
    let (columns, rows): (&[Column], Vec<Vec<String>>) = match kind {
        EntityKind::User => (USER_COLUMNS, store.all_users()?.iter().map(user_row).collect()),
        EntityKind::City => (CITY_COLUMNS, store.all_cities()?.iter().map(city_row).collect()),
        EntityKind::Township => (
            TOWNSHIP_COLUMNS,
            store.all_townships()?.iter().map(township_row).collect(),
        ),
        EntityKind::Case => (CASE_COLUMNS, store.all_cases()?.iter().map(case_row).collect()),
    };

    Ok(SheetTable {
        sheet_name: kind.sheet_name().to_string(),
        columns: columns.to_vec(),
        rows,
    })
}

/// Attachment file name, e.g. `縣市資料_2024-03-05.xlsx`
pub fn export_file_name(kind: EntityKind, format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "{}_{}.{}",
        kind.file_stem(),
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Message used when there is nothing to export
pub fn empty_export_message(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => "沒有找到用戶數據",
        EntityKind::City => "沒有找到城市數據",
        EntityKind::Township => "沒有找到鄉鎮里區數據",
        EntityKind::Case => "沒有找到案件數據",
    }
}

/// A rendered export ready to be sent or written to disk
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub rows: usize,
}

/// Export one kind in the requested format. An empty collection is `NotFound`.
pub fn export_kind<S: EntityStore + ?Sized>(
    store: &S,
    kind: EntityKind,
    format: ExportFormat,
) -> Result<ExportFile> {
    let table = export_table(store, kind)?;
    if table.is_empty() {
        return Err(Error::NotFound(empty_export_message(kind).to_string()));
    }

    let bytes = match format {
        ExportFormat::Xlsx => write_xlsx(&table)?,
        ExportFormat::Csv => write_csv(&table)?,
    };

    tracing::info!(kind = %kind, rows = table.rows.len(), format = format.extension(), "Export rendered");

    Ok(ExportFile {
        file_name: export_file_name(kind, format, Utc::now().date_naive()),
        content_type: format.content_type(),
        bytes,
        rows: table.rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_column_widths_cover_every_column() {
        assert_eq!(USER_COLUMNS.len(), 25);
        assert_eq!(CITY_COLUMNS.len(), 4);
        assert_eq!(TOWNSHIP_COLUMNS.len(), 13);
        assert_eq!(CASE_COLUMNS.len(), 23);
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            export_file_name(EntityKind::Township, ExportFormat::Xlsx, date),
            "鄉鎮里區資料_2024-03-05.xlsx"
        );
        assert_eq!(
            export_file_name(EntityKind::Case, ExportFormat::Csv, date),
            "基本資訊資料_2024-03-05.csv"
        );
    }

    #[test]
    fn test_date_formats_unpadded() {
        let date = NaiveDate::from_ymd_opt(1990, 5, 3);
        assert_eq!(format_date(date), "1990/5/3");
        assert_eq!(format_date(None), "");
    }

    #[test]
    fn test_export_empty_collection_is_not_found() {
        let db = Database::in_memory().unwrap();
        let result = export_kind(&db, EntityKind::City, ExportFormat::Xlsx);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_township_rows_carry_city_name_and_id() {
        let db = Database::in_memory().unwrap();
        let city_id = db.create_city("台北市").unwrap();
        db.create_township(&crate::models::TownshipFields {
            city_id: Some(city_id),
            name: Some("大安區".to_string()),
            ..Default::default()
        })
        .unwrap();

        let table = export_table(&db, EntityKind::Township).unwrap();
        assert_eq!(table.sheet_name, "鄉鎮里區");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "台北市");
        assert_eq!(table.rows[0][2], city_id.to_string());
        assert_eq!(table.rows[0][3], "大安區");
        assert_eq!(table.rows[0][5], "");
    }
}
