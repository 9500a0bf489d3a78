//! Row normalization: one raw spreadsheet row into a kind-specific draft
//!
//! Each target field accepts a prioritised list of column labels, localized
//! label first. Normalization never touches the store and never fails a row:
//! anything it cannot interpret becomes `None`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::models::{
    parse_bool_label, Address, CaseFields, EntityKind, IdentityType, LandAddress, Role,
    TownshipFields, TownshipOffices, UserFields, WorkArea,
};
use crate::sheet::{Cell, Row};

/// Accepted column labels per field, in priority order
pub mod labels {
    pub const ROW_ID: &[&str] = &["ID", "_id", "id"];

    pub mod user {
        pub const NAME: &[&str] = &["姓名", "name"];
        pub const EMAIL: &[&str] = &["電子郵件", "email"];
        pub const NICKNAME: &[&str] = &["暱稱", "nickname"];
        pub const PERSONAL_ID: &[&str] = &["身份證字號", "personalId"];
        pub const PHONE: &[&str] = &["電話", "phone"];
        pub const MOBILE: &[&str] = &["手機", "mobile"];
        pub const ROLE: &[&str] = &["權限", "role"];
        pub const WORK_AREA: &[&str] = &["工作轄區", "workArea"];
        pub const IDENTITY_TYPE: &[&str] = &["身份類型", "identityType"];
        pub const BIRTHDAY: &[&str] = &["生日", "birthday"];
        pub const CITY: &[&str] = &["縣市", "city"];
        pub const DISTRICT: &[&str] = &["區", "district"];
        pub const VILLAGE: &[&str] = &["里", "village"];
        pub const NEIGHBOR: &[&str] = &["鄰", "neighbor"];
        pub const STREET: &[&str] = &["街道", "street"];
        pub const SECTION: &[&str] = &["段", "section"];
        pub const LANE: &[&str] = &["巷", "lane"];
        pub const ALLEY: &[&str] = &["弄", "alley"];
        pub const NUMBER: &[&str] = &["號", "number"];
        pub const FLOOR: &[&str] = &["樓層", "floor"];
        pub const IS_VERIFIED: &[&str] = &["已驗證", "isVerified"];
        pub const IS_LOGGED_IN: &[&str] = &["已登入", "isLoggedIn"];
    }

    pub mod city {
        pub const NAME: &[&str] = &["城市名稱", "name"];
    }

    pub mod township {
        pub const NAME: &[&str] = &["鄉鎮名稱", "name"];
        pub const CITY: &[&str] = &["城市", "city"];
        pub const CITY_ID: &[&str] = &["城市ID", "cityId", "city_id"];
        pub const ZIP_CODE: &[&str] = &["郵遞區號", "zipCode", "zip_code"];
        pub const DISTRICT_COURT: &[&str] = &["地方法院", "districtCourt", "district_court"];
        pub const LAND_OFFICE: &[&str] = &["地政事務所", "landOffice", "land_office"];
        pub const FINANCE_AND_TAX_BUREAU: &[&str] =
            &["財政稅務局", "financeAndTaxBureau", "finance_and_tax_bureau"];
        pub const POLICE_STATION: &[&str] = &["警察局", "policeStation", "police_station"];
        pub const IRS: &[&str] = &["國稅局", "irs"];
        pub const HOME_OFFICE: &[&str] = &["戶政事務所", "homeOffice", "home_office"];
    }

    pub mod case {
        pub const CASE_NUMBER: &[&str] = &["案號", "caseNumber"];
        pub const COMPANY: &[&str] = &["公司", "company"];
        pub const STATUS: &[&str] = &["狀態", "status"];
        pub const CITY: &[&str] = &["城市", "city"];
        pub const CITY_ID: &[&str] = &["城市ID", "cityId", "city_id"];
        pub const TOWNSHIP: &[&str] = &["鄉鎮里區", "township"];
        pub const TOWNSHIP_ID: &[&str] = &["鄉鎮里區ID", "townshipId", "township_id"];
        pub const USER: &[&str] = &["負責人", "user", "responsiblePerson"];
        pub const USER_EMAIL: &[&str] = &["負責人Email", "userEmail", "email"];
        pub const USER_ID: &[&str] = &["負責人ID", "userId", "user_id"];
        pub const BIG_SECTION: &[&str] = &["大段", "bigSection"];
        pub const SMALL_SECTION: &[&str] = &["小段", "smallSection"];
        pub const VILLAGE: &[&str] = &["里", "village"];
        pub const NEIGHBOR: &[&str] = &["鄰", "neighbor"];
        pub const STREET: &[&str] = &["街道", "street"];
        pub const SECTION: &[&str] = &["段", "section"];
        pub const LANE: &[&str] = &["巷", "lane"];
        pub const ALLEY: &[&str] = &["弄", "alley"];
        pub const NUMBER: &[&str] = &["號", "number"];
        pub const FLOOR: &[&str] = &["樓層", "floor"];
    }
}

/// A reference given by identifier and/or name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefInput {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl RefInput {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none()
    }
}

/// A responsible-person reference on a case row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRefInput {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDraft {
    pub row_id: Option<String>,
    pub fields: UserFields,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityDraft {
    pub row_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TownshipDraft {
    pub row_id: Option<String>,
    pub city: RefInput,
    /// `city_id` is filled in by the resolver
    pub fields: TownshipFields,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseDraft {
    pub row_id: Option<String>,
    pub city: RefInput,
    pub township: RefInput,
    pub user: UserRefInput,
    /// Reference ids are filled in by the resolver
    pub fields: CaseFields,
}

/// A normalized row of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    User(UserDraft),
    City(CityDraft),
    Township(TownshipDraft),
    Case(CaseDraft),
}

/// Normalize one row for the given entity kind
pub fn normalize(row: &Row, kind: EntityKind) -> Draft {
    match kind {
        EntityKind::User => Draft::User(normalize_user(row)),
        EntityKind::City => Draft::City(normalize_city(row)),
        EntityKind::Township => Draft::Township(normalize_township(row)),
        EntityKind::Case => Draft::Case(normalize_case(row)),
    }
}

fn row_id(row: &Row) -> Option<String> {
    row.first_text(labels::ROW_ID)
}

pub fn normalize_user(row: &Row) -> UserDraft {
    use labels::user::*;

    let text = |labels: &[&str]| row.first_text(labels);

    UserDraft {
        row_id: row_id(row),
        fields: UserFields {
            name: text(NAME),
            email: text(EMAIL).map(|e| e.to_lowercase()),
            nickname: text(NICKNAME),
            personal_id: text(PERSONAL_ID),
            phone: text(PHONE),
            mobile: text(MOBILE),
            role: text(ROLE).and_then(|s| Role::from_any(&s)),
            work_area: text(WORK_AREA).and_then(|s| WorkArea::from_any(&s)),
            identity_type: text(IDENTITY_TYPE).and_then(|s| IdentityType::from_any(&s)),
            birthday: row.first_cell(BIRTHDAY).and_then(parse_date),
            address: Address {
                city: text(CITY),
                district: text(DISTRICT),
                village: text(VILLAGE),
                neighbor: text(NEIGHBOR),
                street: text(STREET),
                section: text(SECTION),
                lane: text(LANE),
                alley: text(ALLEY),
                number: text(NUMBER),
                floor: text(FLOOR),
            },
            is_verified: text(IS_VERIFIED).and_then(|s| parse_bool_label(&s)),
            is_logged_in: text(IS_LOGGED_IN).and_then(|s| parse_bool_label(&s)),
        },
    }
}

pub fn normalize_city(row: &Row) -> CityDraft {
    CityDraft {
        row_id: row_id(row),
        name: row.first_text(labels::city::NAME),
    }
}

pub fn normalize_township(row: &Row) -> TownshipDraft {
    use labels::township::*;

    let text = |labels: &[&str]| row.first_text(labels);

    TownshipDraft {
        row_id: row_id(row),
        city: RefInput {
            id: text(CITY_ID),
            name: text(CITY),
        },
        fields: TownshipFields {
            city_id: None,
            name: text(NAME),
            offices: TownshipOffices {
                zip_code: text(ZIP_CODE),
                district_court: text(DISTRICT_COURT),
                land_office: text(LAND_OFFICE),
                finance_and_tax_bureau: text(FINANCE_AND_TAX_BUREAU),
                police_station: text(POLICE_STATION),
                irs: text(IRS),
                home_office: text(HOME_OFFICE),
            },
        },
    }
}

pub fn normalize_case(row: &Row) -> CaseDraft {
    use labels::case::*;

    let text = |labels: &[&str]| row.first_text(labels);

    CaseDraft {
        row_id: row_id(row),
        city: RefInput {
            id: text(CITY_ID),
            name: text(CITY),
        },
        township: RefInput {
            id: text(TOWNSHIP_ID),
            name: text(TOWNSHIP),
        },
        user: UserRefInput {
            id: text(USER_ID),
            email: text(USER_EMAIL),
            name: text(USER),
        },
        fields: CaseFields {
            case_number: text(CASE_NUMBER),
            company: text(COMPANY),
            city_id: None,
            township_id: None,
            land: LandAddress {
                big_section: text(BIG_SECTION),
                small_section: text(SMALL_SECTION),
                village: text(VILLAGE),
                neighbor: text(NEIGHBOR),
                street: text(STREET),
                section: text(SECTION),
                lane: text(LANE),
                alley: text(ALLEY),
                number: text(NUMBER),
                floor: text(FLOOR),
            },
            status: text(STATUS),
            user_id: None,
        },
    }
}

/// Excel serial day 0 (the 1900 leap-year bug is baked into this epoch)
fn excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    // 1900-01-01 through 9999-12-31
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    excel_epoch()?.checked_add_days(chrono::Days::new(serial.trunc() as u64))
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y", "%Y年%m月%d日"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

/// Permissive date parsing for spreadsheet cells.
///
/// Accepts typed date cells, Excel serial numbers, ISO and slash forms (with
/// or without zero padding), US `M/D/YYYY`, `YYYY年M月D日` and RFC 3339.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Int(n) => from_excel_serial(*n as f64),
        Cell::Float(f) => from_excel_serial(*f),
        Cell::String(s) => parse_date_str(s.trim()),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(date);
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    // Serial numbers that arrived as text (e.g. from CSV)
    s.parse::<f64>()
        .ok()
        .and_then(from_excel_serial)
        .filter(|d| d.year() >= 1900)
}
